//! End-to-end publish runs against an in-memory repository.

use async_trait::async_trait;
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use kodegen_publish::artifact::ArtifactFile;
use kodegen_publish::config::{EnvConfig, ProjectManifest, PublishConfig, RetryConfig};
use kodegen_publish::credentials::RepositoryAuth;
use kodegen_publish::error::{ErrorKind, RepositoryError, Result};
use kodegen_publish::publish::{PublishResult, Publisher, Selection, Stage};
use kodegen_publish::report::PublishReport;
use kodegen_publish::repository::{
    RepositoryClient, RepositoryConnector, RepositoryTarget, StagingRepository, UploadDestination,
};
use kodegen_publish::signing::verify_detached;
use pkcs8::{EncodePrivateKey, LineEnding};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const MANIFEST: &str = r#"
[project]
group = "com.example"
description = "Example library"
url = "https://github.com/example/lib"
developers = [{ id = "dev", name = "Dev Eloper" }]

[project.license]
name = "MIT"
url = "https://opensource.org/licenses/MIT"

[project.scm]
connection = "scm:git:git://github.com/example/lib.git"
url = "https://github.com/example/lib"

[[modules]]
artifact_id = "core"

[[modules]]
artifact_id = "extras"
"#;

const RELEASE_URL: &str = "https://oss.sonatype.org/service/local/";
const SNAPSHOT_URL: &str = "https://oss.sonatype.org/content/repositories/snapshots/";
const KEY_SEED: [u8; 32] = [42u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Connect(String),
    FindProfile(String),
    Open(String),
    Upload {
        destination: UploadDestination,
        path: String,
        file: String,
        content: Bytes,
    },
    Close(String),
    Release(String),
}

/// Failure the in-memory repository injects
#[derive(Debug, Clone, Default)]
enum Fault {
    #[default]
    None,
    /// Upload of this file is rejected with HTTP 400
    RejectUpload(String),
    /// Upload of this file is refused with HTTP 401
    DenyUpload(String),
    /// The first N uploads of this file fail with a transport error
    FlakyUpload(String, u32),
    /// Close requests are rejected by staging rules
    RejectClose,
    /// The first poll after a close fails with a transport error
    FlakyPoll,
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    attempts: Mutex<Vec<String>>,
    polls: Mutex<u32>,
    fault: Fault,
}

impl Recorder {
    fn with_fault(fault: Fault) -> Self {
        Self {
            fault,
            ..Self::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    /// Upload attempts of `file`, successful or not
    fn attempts(&self, file: &str) -> usize {
        self.attempts
            .lock()
            .expect("lock")
            .iter()
            .filter(|f| *f == file)
            .count()
    }

    fn uploads(&self) -> Vec<(UploadDestination, String, Bytes)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Upload {
                    destination,
                    file,
                    content,
                    ..
                } => Some((destination, file, content)),
                _ => None,
            })
            .collect()
    }
}

struct FakeConnector {
    recorder: Arc<Recorder>,
}

impl RepositoryConnector for FakeConnector {
    fn connect(
        &self,
        target: &RepositoryTarget,
        _auth: &RepositoryAuth,
    ) -> Result<Arc<dyn RepositoryClient>> {
        self.recorder.record(Call::Connect(target.name.clone()));
        Ok(Arc::new(FakeClient {
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct FakeClient {
    recorder: Arc<Recorder>,
}

#[async_trait]
impl RepositoryClient for FakeClient {
    async fn find_staging_profile(&self, group: &str) -> Result<String> {
        self.recorder.record(Call::FindProfile(group.to_string()));
        Ok("profile-1".to_string())
    }

    async fn open_staging(&self, profile_id: &str, _description: &str) -> Result<StagingRepository> {
        self.recorder.record(Call::Open(profile_id.to_string()));
        Ok(StagingRepository {
            id: "comexample-1001".to_string(),
            profile_id: profile_id.to_string(),
        })
    }

    async fn upload(
        &self,
        destination: &UploadDestination,
        path: &str,
        file: &ArtifactFile,
    ) -> Result<()> {
        self.recorder
            .attempts
            .lock()
            .expect("lock")
            .push(file.file_name.clone());
        let attempt = self.recorder.attempts(&file.file_name);

        match &self.recorder.fault {
            Fault::RejectUpload(name) if *name == file.file_name => {
                return Err(RepositoryError::Rejected {
                    operation: format!("upload {}", file.file_name),
                    endpoint: destination.to_string(),
                    status: 400,
                    body: "invalid artifact".to_string(),
                }
                .into());
            }
            Fault::DenyUpload(name) if *name == file.file_name => {
                return Err(RepositoryError::AuthenticationRejected {
                    endpoint: destination.to_string(),
                    status: 401,
                }
                .into());
            }
            Fault::FlakyUpload(name, failures)
                if *name == file.file_name && attempt <= *failures as usize =>
            {
                return Err(RepositoryError::Transport {
                    operation: format!("upload {}", file.file_name),
                    reason: "connection reset".to_string(),
                }
                .into());
            }
            _ => {}
        }
        self.recorder.record(Call::Upload {
            destination: destination.clone(),
            path: path.to_string(),
            file: file.file_name.clone(),
            content: file.content.clone(),
        });
        Ok(())
    }

    async fn close_staging(&self, repository: &StagingRepository, _description: &str) -> Result<()> {
        self.recorder.record(Call::Close(repository.id.clone()));
        if matches!(self.recorder.fault, Fault::RejectClose) {
            return Err(RepositoryError::StagingFailed {
                action: "close",
                repository_id: repository.id.clone(),
                reason: "HTTP 400: missing javadoc".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn wait_until_closed(&self, _repository: &StagingRepository) -> Result<()> {
        let mut polls = self.recorder.polls.lock().expect("lock");
        *polls += 1;
        if matches!(self.recorder.fault, Fault::FlakyPoll) && *polls == 1 {
            return Err(RepositoryError::Transport {
                operation: "poll staging repository".to_string(),
                reason: "HTTP 503".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn release_staging(
        &self,
        repository: &StagingRepository,
        _description: &str,
    ) -> Result<()> {
        self.recorder.record(Call::Release(repository.id.clone()));
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    manifest: ProjectManifest,
}

/// Project with built `core` and `extras` jars for `version`
fn fixture(version: &str, extra: &str) -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let content = format!("{}{}", MANIFEST, extra);
    let manifest = ProjectManifest::parse(
        &content,
        &dir.path().join("Publish.toml"),
        dir.path().to_path_buf(),
    )
    .expect("manifest");

    for module in ["core", "extras"] {
        let libs = dir.path().join(module).join("build").join("libs");
        std::fs::create_dir_all(&libs).expect("libs dir");
        std::fs::write(
            libs.join(format!("{}-{}.jar", module, version)),
            format!("{} classes", module),
        )
        .expect("write jar");
    }

    Fixture { dir, manifest }
}

fn repository_credentials() -> Vec<(&'static str, String)> {
    vec![
        ("OSSRH_USERNAME", "deployer".to_string()),
        ("OSSRH_PASSWORD", "token".to_string()),
    ]
}

fn signing_credentials() -> Vec<(&'static str, String)> {
    let pem = SigningKey::from_bytes(&KEY_SEED)
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode key")
        .as_str()
        .to_string();
    vec![("SIGNING_KEY", pem), ("SIGNING_PASSWORD", "unused".to_string())]
}

fn with_version(version: &str, mut env: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
    env.push(("PUBLISH_VERSION", version.to_string()));
    env
}

fn publisher(
    fixture: &Fixture,
    env: Vec<(&'static str, String)>,
    recorder: &Arc<Recorder>,
    retry: RetryConfig,
) -> Publisher {
    let mut config = PublishConfig::new(fixture.manifest.clone(), EnvConfig::from_pairs(env));
    config.retry = retry;
    config.report_path = fixture.dir.path().join("report.json");

    let connector = Arc::new(FakeConnector {
        recorder: Arc::clone(recorder),
    });
    Publisher::new(config, connector)
}

async fn run_with(
    fixture: &Fixture,
    env: Vec<(&'static str, String)>,
    recorder: &Arc<Recorder>,
    retry: RetryConfig,
) -> PublishReport {
    publisher(fixture, env, recorder, retry)
        .run(&Selection::default())
        .await
        .expect("publish run")
}

async fn run(
    fixture: &Fixture,
    env: Vec<(&'static str, String)>,
    recorder: &Arc<Recorder>,
) -> PublishReport {
    run_with(fixture, env, recorder, RetryConfig::immediate(0)).await
}

fn result<'a>(report: &'a PublishReport, module: &str, target: &str) -> &'a PublishResult {
    report
        .module(module)
        .and_then(|m| m.result_for(target))
        .expect("result present")
}

#[tokio::test]
async fn test_release_with_full_credentials_is_staged_and_signed() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::default());
    let mut env = with_version("1.2.0", repository_credentials());
    env.extend(signing_credentials());

    let report = run(&fixture, env, &recorder).await;
    assert!(report.is_success());

    for module in ["core", "extras"] {
        assert_eq!(
            result(&report, module, "sonatype"),
            &PublishResult::Published {
                coordinate: format!("com.example:{}:1.2.0", module),
                endpoint: RELEASE_URL.to_string(),
                signed: true,
                staging_repository: Some("comexample-1001".to_string()),
            }
        );
    }

    // One signature per artifact, each verifying against the uploaded bytes
    let uploads = recorder.uploads();
    let verifying_key = SigningKey::from_bytes(&KEY_SEED).verifying_key();
    let signatures: Vec<&(UploadDestination, String, Bytes)> =
        uploads.iter().filter(|(_, file, _)| file.ends_with(".sig")).collect();
    assert_eq!(signatures.len(), 4);
    for (_, sig_name, sig_content) in signatures {
        let subject = sig_name.trim_end_matches(".sig");
        let (_, _, content) = uploads
            .iter()
            .find(|(_, file, _)| file == subject)
            .expect("signed file uploaded");
        verify_detached(&verifying_key, subject, content, sig_content).expect("verifies");
    }
    assert!(uploads.iter().any(|(_, file, _)| file == "core-1.2.0.jar.sig.sha1"));
    assert!(uploads.iter().all(|(destination, _, _)| matches!(
        destination,
        UploadDestination::Staging(repo) if repo.id == "comexample-1001"
    )));

    let calls = recorder.calls();
    assert_eq!(calls[0], Call::Connect("sonatype".to_string()));
    assert_eq!(calls[1], Call::FindProfile("com.example".to_string()));
    assert_eq!(calls[2], Call::Open("profile-1".to_string()));
    assert_eq!(
        &calls[calls.len() - 2..],
        &[
            Call::Close("comexample-1001".to_string()),
            Call::Release("comexample-1001".to_string()),
        ]
    );
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Open(_))).count(),
        1,
        "modules share one staging repository"
    );
}

#[tokio::test]
async fn test_snapshot_without_signing_goes_to_snapshot_endpoint_unsigned() {
    let fixture = fixture("1.2.0-SNAPSHOT", "");
    let recorder = Arc::new(Recorder::default());

    let report = run(
        &fixture,
        with_version("1.2.0-SNAPSHOT", repository_credentials()),
        &recorder,
    )
    .await;
    assert!(report.is_success());

    let core = report.module("core").expect("core report");
    assert!(!core.signed);
    assert_eq!(
        result(&report, "core", "sonatype"),
        &PublishResult::Published {
            coordinate: "com.example:core:1.2.0-SNAPSHOT".to_string(),
            endpoint: SNAPSHOT_URL.to_string(),
            signed: false,
            staging_repository: None,
        }
    );

    let calls = recorder.calls();
    assert!(!calls.iter().any(|c| matches!(
        c,
        Call::Open(_) | Call::Close(_) | Call::Release(_) | Call::FindProfile(_)
    )));
    let uploads = recorder.uploads();
    assert!(!uploads.iter().any(|(_, file, _)| file.ends_with(".sig")));
    assert!(uploads.iter().all(|(destination, _, _)| matches!(
        destination,
        UploadDestination::Direct(url) if url.as_str() == SNAPSHOT_URL
    )));

    let paths: Vec<String> = calls
        .iter()
        .filter_map(|c| match c {
            Call::Upload { path, .. } => Some(path.clone()),
            _ => None,
        })
        .collect();
    assert!(paths.contains(&"com/example/core/1.2.0-SNAPSHOT".to_string()));
    assert!(paths.contains(&"com/example/extras/1.2.0-SNAPSHOT".to_string()));
}

#[tokio::test]
async fn test_unresolved_version_is_config_error_without_network() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::default());
    let mut env = repository_credentials();
    env.extend(signing_credentials());

    let report = run(&fixture, env, &recorder).await;
    assert!(!report.is_success());

    for module in ["core", "extras"] {
        let outcome = result(&report, module, "sonatype");
        assert_eq!(outcome.stage(), Some(Stage::Version));
        assert_eq!(outcome.kind(), Some(ErrorKind::Config));
        assert!(report.module(module).expect("module").version.is_none());
    }
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn test_missing_repository_credentials_skip_target() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::default());

    let report = run(&fixture, with_version("1.2.0", signing_credentials()), &recorder).await;

    assert!(report.is_success());
    assert!(matches!(
        result(&report, "core", "sonatype"),
        PublishResult::Skipped { .. }
    ));
    assert!(report.module("core").expect("core").signed);
    assert_eq!(report.counts().skipped, 2);
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn test_unsigned_release_rejected_when_signatures_required() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::default());

    let report = run(&fixture, with_version("1.2.0", repository_credentials()), &recorder).await;

    let outcome = result(&report, "core", "sonatype");
    assert_eq!(outcome.stage(), Some(Stage::Signing));
    assert_eq!(outcome.kind(), Some(ErrorKind::Signing));
    assert!(recorder.calls().is_empty());
}

#[tokio::test]
async fn test_failed_upload_leaves_staging_repository_open() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::with_fault(Fault::RejectUpload(
        "extras-1.2.0.jar".to_string(),
    )));
    let mut env = with_version("1.2.0", repository_credentials());
    env.extend(signing_credentials());
    env.push(("OSSRH_STAGING_PROFILE_ID", "from-env".to_string()));

    let report = run(&fixture, env, &recorder).await;
    assert!(!report.is_success());

    let extras = result(&report, "extras", "sonatype");
    assert_eq!(extras.stage(), Some(Stage::Upload));
    let core = result(&report, "core", "sonatype");
    assert_eq!(core.stage(), Some(Stage::StagingClose));
    assert_eq!(core.kind(), Some(ErrorKind::Staging));

    let calls = recorder.calls();
    assert!(calls.contains(&Call::Open("from-env".to_string())));
    assert!(!calls.iter().any(|c| matches!(c, Call::FindProfile(_))));
    assert!(!calls.iter().any(|c| matches!(c, Call::Close(_) | Call::Release(_))));
}

#[tokio::test]
async fn test_unstaged_target_uploads_release_directly() {
    let targets = r#"
[[targets]]
name = "internal"
release_url = "https://nexus.example/repository/releases"
snapshot_url = "https://nexus.example/repository/snapshots"
staged = false
require_signatures = false

[[targets]]
name = "mirror"
release_url = "https://mirror.example/service/local/"
snapshot_url = "https://mirror.example/content/repositories/snapshots/"
"#;
    let fixture = fixture("1.2.0", targets);
    let recorder = Arc::new(Recorder::default());
    let env = with_version(
        "1.2.0",
        vec![
            ("INTERNAL_USERNAME", "ci".to_string()),
            ("INTERNAL_PASSWORD", "secret".to_string()),
        ],
    );

    let report = run(&fixture, env, &recorder).await;
    assert!(report.is_success());

    assert_eq!(
        result(&report, "core", "internal"),
        &PublishResult::Published {
            coordinate: "com.example:core:1.2.0".to_string(),
            endpoint: "https://nexus.example/repository/releases/".to_string(),
            signed: false,
            staging_repository: None,
        }
    );
    assert!(matches!(
        result(&report, "core", "mirror"),
        PublishResult::Skipped { .. }
    ));

    let calls = recorder.calls();
    assert_eq!(calls[0], Call::Connect("internal".to_string()));
    assert!(!calls.iter().any(|c| matches!(c, Call::Connect(name) if name == "mirror")));
    assert!(!calls.iter().any(|c| matches!(c, Call::Open(_) | Call::Close(_))));

    // POM and its checksums come after the jar
    let files: Vec<String> = recorder
        .uploads()
        .into_iter()
        .filter(|(_, file, _)| file.starts_with("core-"))
        .map(|(_, file, _)| file)
        .collect();
    assert_eq!(files.first().map(String::as_str), Some("core-1.2.0.jar"));
    assert_eq!(files.len(), 10);
    assert!(files[5..].iter().all(|f| f.starts_with("core-1.2.0.pom")));
}

#[tokio::test]
async fn test_missing_primary_artifact_fails_build_stage_only_for_that_module() {
    let fixture = fixture("1.2.0", "");
    std::fs::remove_file(
        fixture
            .dir
            .path()
            .join("extras")
            .join("build")
            .join("libs")
            .join("extras-1.2.0.jar"),
    )
    .expect("remove jar");
    let recorder = Arc::new(Recorder::default());
    let mut env = with_version("1.2.0", repository_credentials());
    env.extend(signing_credentials());

    let report = run(&fixture, env, &recorder).await;

    let extras = result(&report, "extras", "sonatype");
    assert_eq!(extras.stage(), Some(Stage::Build));
    assert_eq!(extras.kind(), Some(ErrorKind::Build));
    assert_eq!(
        report.module("extras").expect("extras").version.as_deref(),
        Some("1.2.0")
    );
    assert!(result(&report, "core", "sonatype").is_published());
    assert!(!recorder
        .uploads()
        .iter()
        .any(|(_, file, _)| file.starts_with("extras-")));
}

#[tokio::test]
async fn test_close_failure_after_uploads_is_reported_as_staging_close() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::with_fault(Fault::RejectClose));
    let mut env = with_version("1.2.0", repository_credentials());
    env.extend(signing_credentials());

    let report = run(&fixture, env, &recorder).await;
    assert!(!report.is_success());

    for module in ["core", "extras"] {
        let outcome = result(&report, module, "sonatype");
        assert_eq!(outcome.stage(), Some(Stage::StagingClose));
        assert_eq!(outcome.kind(), Some(ErrorKind::Staging));
    }

    let calls = recorder.calls();
    assert!(recorder.uploads().iter().any(|(_, file, _)| file == "core-1.2.0.pom"));
    assert!(recorder.uploads().iter().any(|(_, file, _)| file == "extras-1.2.0.pom"));
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Close(_))).count(),
        1
    );
    assert!(!calls.iter().any(|c| matches!(c, Call::Release(_))));
}

#[tokio::test]
async fn test_failed_poll_does_not_resend_close() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::with_fault(Fault::FlakyPoll));
    let mut env = with_version("1.2.0", repository_credentials());
    env.extend(signing_credentials());

    let report = run_with(&fixture, env, &recorder, RetryConfig::immediate(2)).await;
    assert!(report.is_success());

    let calls = recorder.calls();
    assert_eq!(
        calls.iter().filter(|c| matches!(c, Call::Close(_))).count(),
        1
    );
    assert_eq!(calls.last(), Some(&Call::Release("comexample-1001".to_string())));
    assert_eq!(*recorder.polls.lock().expect("lock"), 2);
}

#[tokio::test]
async fn test_rejected_credentials_fail_upload_without_retry() {
    let fixture = fixture("1.2.0-SNAPSHOT", "");
    let recorder = Arc::new(Recorder::with_fault(Fault::DenyUpload(
        "core-1.2.0-SNAPSHOT.jar".to_string(),
    )));
    let env = with_version("1.2.0-SNAPSHOT", repository_credentials());

    let report = run_with(&fixture, env, &recorder, RetryConfig::immediate(3)).await;

    let core = result(&report, "core", "sonatype");
    assert_eq!(core.stage(), Some(Stage::Upload));
    assert_eq!(core.kind(), Some(ErrorKind::Auth));
    assert_eq!(recorder.attempts("core-1.2.0-SNAPSHOT.jar"), 1);
    assert!(!recorder
        .uploads()
        .iter()
        .any(|(_, file, _)| file.starts_with("core-")));

    // Sibling module is isolated from the failure
    assert!(result(&report, "extras", "sonatype").is_published());
}

#[tokio::test]
async fn test_transient_upload_failure_is_retried() {
    let fixture = fixture("1.2.0-SNAPSHOT", "");
    let recorder = Arc::new(Recorder::with_fault(Fault::FlakyUpload(
        "core-1.2.0-SNAPSHOT.jar".to_string(),
        2,
    )));
    let env = with_version("1.2.0-SNAPSHOT", repository_credentials());

    let report = run_with(&fixture, env, &recorder, RetryConfig::immediate(3)).await;
    assert!(report.is_success());

    assert!(result(&report, "core", "sonatype").is_published());
    assert_eq!(recorder.attempts("core-1.2.0-SNAPSHOT.jar"), 3);
    assert_eq!(recorder.attempts("core-1.2.0-SNAPSHOT.pom"), 1);
}

#[tokio::test]
async fn test_transient_upload_failure_exhausts_retries() {
    let fixture = fixture("1.2.0-SNAPSHOT", "");
    let recorder = Arc::new(Recorder::with_fault(Fault::FlakyUpload(
        "core-1.2.0-SNAPSHOT.jar".to_string(),
        u32::MAX,
    )));
    let env = with_version("1.2.0-SNAPSHOT", repository_credentials());

    let report = run_with(&fixture, env, &recorder, RetryConfig::immediate(2)).await;

    let core = result(&report, "core", "sonatype");
    assert_eq!(core.stage(), Some(Stage::Upload));
    assert_eq!(core.kind(), Some(ErrorKind::Transport));
    assert_eq!(recorder.attempts("core-1.2.0-SNAPSHOT.jar"), 3);
}

#[tokio::test]
async fn test_signing_key_is_unreachable_after_run() {
    let fixture = fixture("1.2.0", "");
    let recorder = Arc::new(Recorder::default());
    let mut env = with_version("1.2.0", repository_credentials());
    env.extend(signing_credentials());

    let publisher = publisher(&fixture, env, &recorder, RetryConfig::immediate(0));
    assert!(publisher.config().env.get("SIGNING_KEY").is_none());
    assert!(publisher.config().env.get("SIGNING_PASSWORD").is_none());
    assert!(publisher.holds_signing_key());

    let report = publisher.run(&Selection::default()).await.expect("run");
    assert!(report.is_success());
    assert!(report.module("core").expect("core").signed);
    assert!(!publisher.holds_signing_key());

    // Nothing left to sign with: the release is refused
    let again = publisher.run(&Selection::default()).await.expect("second run");
    let outcome = result(&again, "core", "sonatype");
    assert_eq!(outcome.stage(), Some(Stage::Signing));
    assert_eq!(outcome.kind(), Some(ErrorKind::Signing));
}
