//! Shared helper functions for command execution.

use crate::cli::RuntimeConfig;
use crate::config::{EnvConfig, ProjectManifest, PublishConfig};
use crate::error::Result;

/// Load Publish.toml and the environment snapshot into a [`PublishConfig`]
pub(super) fn load_publish_config(
    config: &RuntimeConfig,
    version: Option<&String>,
) -> Result<PublishConfig> {
    config.verbose_println(&format!(
        "Loading manifest {}",
        config.manifest_path.display()
    ));
    let manifest = ProjectManifest::load(&config.manifest_path)?;

    let mut env = EnvConfig::from_process();
    if let Some(env_file) = &config.env_file {
        config.verbose_println(&format!("Merging environment from {}", env_file.display()));
        env = env.with_dotenv(env_file)?;
    }

    Ok(PublishConfig::new(manifest, env).with_version_override(version.cloned()))
}
