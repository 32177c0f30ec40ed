//! Configuration for publish runs.
//!
//! A single [`PublishConfig`] is constructed at the entry point from the parsed
//! `Publish.toml`, an environment snapshot and command line overrides, then threaded
//! through every stage.

mod env;
mod manifest;
mod retry;

pub use env::EnvConfig;
pub use manifest::{
    BuildConfig, DependencyConfig, DeveloperConfig, IssuesConfig, LicenseConfig,
    MANIFEST_FILE_NAME, ModuleConfig, OrganizationConfig, ProjectConfig, ProjectManifest,
    ScmConfig, TargetConfig, VersioningConfig,
};
pub use retry::RetryConfig;

use std::path::PathBuf;
use std::time::Duration;

/// Default timeout for a single HTTP call
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Lower bound for `PUBLISH_HTTP_TIMEOUT_SECS`; zero would fail every call
pub const MIN_HTTP_TIMEOUT_SECS: u64 = 1;

/// Configuration for a publish run
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Parsed manifest
    pub manifest: ProjectManifest,
    /// Environment snapshot
    pub env: EnvConfig,
    /// Explicit version override (takes precedence over every other source)
    pub version_override: Option<String>,
    /// Skip the external compile/test step
    pub skip_build: bool,
    /// Retry limits and backoff
    pub retry: RetryConfig,
    /// Timeout for every network call
    pub http_timeout: Duration,
    /// Maximum concurrent file uploads per target
    pub max_concurrent_uploads: usize,
    /// Where the publish report is written
    pub report_path: PathBuf,
}

impl PublishConfig {
    /// Build a config from a manifest and environment, applying env driven defaults
    pub fn new(manifest: ProjectManifest, env: EnvConfig) -> Self {
        let retry = RetryConfig::from_env(&env);
        let http_timeout = Duration::from_secs(
            env.get_parsed::<u64>("PUBLISH_HTTP_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
                .max(MIN_HTTP_TIMEOUT_SECS),
        );
        let version_override = env.get_non_blank("PUBLISH_VERSION").map(str::to_string);
        let report_path = manifest.root.join(crate::report::REPORT_FILE_NAME);

        Self {
            manifest,
            env,
            version_override,
            skip_build: false,
            retry,
            http_timeout,
            max_concurrent_uploads: num_cpus::get().clamp(2, 8),
            report_path,
        }
    }

    /// Apply a command line version override; it wins over `PUBLISH_VERSION`
    pub fn with_version_override(mut self, version: Option<String>) -> Self {
        if let Some(v) = version.filter(|v| !v.trim().is_empty()) {
            self.version_override = Some(v);
        }
        self
    }
}
