//! Git tag lookup for version resolution.

use std::path::Path;

/// Exact tag pointing at HEAD, if any.
///
/// Lookup failures (no repository, no git binary, untagged HEAD) are not errors:
/// the tag is only one optional version source.
pub async fn head_tag(repo_path: &Path) -> Option<String> {
    let output = tokio::process::Command::new("git")
        .args(["describe", "--tags", "--exact-match", "HEAD"])
        .current_dir(repo_path)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => {
            let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if tag.is_empty() { None } else { Some(tag) }
        }
        Ok(output) => {
            log::debug!(
                "No exact git tag on HEAD in {}: {}",
                repo_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            None
        }
        Err(e) => {
            log::debug!("git describe could not run in {}: {}", repo_path.display(), e);
            None
        }
    }
}
