//! Command line behavior of the kodegen_publish binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[project]
group = "com.example"
description = "Example library"
url = "https://github.com/example/lib"
developers = [{ id = "dev" }]

[project.license]
name = "Apache-2.0"
url = "https://www.apache.org/licenses/LICENSE-2.0"

[project.scm]
connection = "scm:git:git://github.com/example/lib.git"
url = "https://github.com/example/lib"

[[modules]]
artifact_id = "core"
"#;

const CREDENTIAL_VARS: [&str; 5] = [
    "PUBLISH_VERSION",
    "OSSRH_USERNAME",
    "OSSRH_PASSWORD",
    "SIGNING_KEY",
    "SIGNING_PASSWORD",
];

fn project() -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("Publish.toml"), MANIFEST).expect("write manifest");
    dir
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kodegen_publish").expect("binary built");
    cmd.current_dir(dir);
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_validate_reports_coordinates_as_json() {
    let dir = project();
    cli(dir.path())
        .args(["validate", "--json", "--version", "1.2.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example:core:1.2.0"))
        .stdout(predicate::str::contains("\"signing\": false"));
}

#[test]
fn test_validate_fails_without_version() {
    let dir = project();
    cli(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Version could not be resolved"));
}

#[test]
fn test_missing_manifest_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    cli(dir.path())
        .args(["validate", "--manifest", "nowhere/Publish.toml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Recovery suggestions"));
}

#[test]
fn test_pom_prints_rendered_descriptor() {
    let dir = project();
    cli(dir.path())
        .args(["pom", "--module", "core", "--version", "2.0.0-SNAPSHOT"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<artifactId>core</artifactId>"))
        .stdout(predicate::str::contains("<version>2.0.0-SNAPSHOT</version>"))
        .stdout(predicate::str::contains(
            "<url>https://github.com/example/lib/issues</url>",
        ));
}

#[test]
fn test_pom_unknown_module_fails() {
    let dir = project();
    cli(dir.path())
        .args(["pom", "--module", "missing", "--version", "1.0.0"])
        .assert()
        .failure();
}

#[test]
fn test_publish_without_credentials_skips_and_writes_report() {
    let dir = project();
    let libs = dir.path().join("core").join("build").join("libs");
    std::fs::create_dir_all(&libs).expect("libs dir");
    std::fs::write(libs.join("core-1.2.0.jar"), b"classes").expect("write jar");

    cli(dir.path())
        .args(["publish", "--version", "1.2.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no credentials for target 'sonatype'"));

    let report = dir.path().join(".kodegen_publish_report.json");
    assert!(report.is_file());

    cli(dir.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"skipped\""));
}

#[test]
fn test_status_without_report() {
    let dir = project();
    cli(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No publish report found"));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    let dir = project();
    cli(dir.path())
        .args(["status", "--quiet", "--verbose"])
        .assert()
        .failure();
}
