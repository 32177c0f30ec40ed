//! Comprehensive error types for kodegen_publish operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.
//! Every error maps onto one [`ErrorKind`] so the pipeline can decide whether a failure is
//! fatal, retryable or a configuration problem that must stop the run before any network call.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kodegen_publish operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all kodegen_publish operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Publish.toml loading and validation errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Module descriptor errors
    #[error("Descriptor error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// Version resolution errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// External compile/test step errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Artifact signing errors
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Remote repository errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Report persistence errors
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification of failures used by the pipeline and the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing static metadata, unresolved version, unknown staging profile
    Config,
    /// Credentials rejected by the remote repository
    Auth,
    /// Bad key material, signature mismatch or missing required signature
    Signing,
    /// Network failure or timeout
    Transport,
    /// Staging repository could not be closed or released
    Staging,
    /// External compile/test step failed
    Build,
    /// Local filesystem failure
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Config => write!(f, "ConfigError"),
            ErrorKind::Auth => write!(f, "AuthError"),
            ErrorKind::Signing => write!(f, "SigningError"),
            ErrorKind::Transport => write!(f, "TransportError"),
            ErrorKind::Staging => write!(f, "StagingError"),
            ErrorKind::Build => write!(f, "BuildError"),
            ErrorKind::Io => write!(f, "IoError"),
        }
    }
}

/// Publish.toml errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file missing
    #[error("Publish manifest not found at {path}")]
    NotFound {
        /// Path where Publish.toml was expected
        path: PathBuf,
    },

    /// Manifest could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Manifest declares no modules
    #[error("No [[modules]] declared in {path}")]
    NoModules {
        /// Manifest path
        path: PathBuf,
    },

    /// Module requested on the command line does not exist
    #[error("Module '{name}' not found in manifest")]
    ModuleNotFound {
        /// Module artifact id
        name: String,
    },

    /// Target requested on the command line does not exist
    #[error("Repository target '{name}' not found in manifest")]
    TargetNotFound {
        /// Target name
        name: String,
    },

    /// Two entries share the same identifier
    #[error("Duplicate {what} '{name}' in manifest")]
    Duplicate {
        /// Kind of entry (module, target)
        what: &'static str,
        /// Duplicated identifier
        name: String,
    },

    /// Custom target without an endpoint
    #[error("Target '{target}' has no {which} URL; set `{which}_url` in Publish.toml or {variable}")]
    MissingUrl {
        /// Target name
        target: String,
        /// `release` or `snapshot`
        which: &'static str,
        /// Environment variable that would supply it
        variable: String,
    },

    /// Invalid endpoint URL
    #[error("Invalid URL for target '{target}': {url} ({reason})")]
    InvalidUrl {
        /// Target name
        target: String,
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },
}

/// Module descriptor errors
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Required descriptor field missing
    #[error("Missing required field '{field}' for module '{module}'")]
    MissingField {
        /// Module artifact id
        module: String,
        /// Field path
        field: &'static str,
    },

    /// POM template rendering failed
    #[error("Failed to render descriptor for '{module}': {reason}")]
    Render {
        /// Module artifact id
        module: String,
        /// Template engine message
        reason: String,
    },
}

/// Version resolution errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// No version source produced a value
    #[error("Version could not be resolved for module '{module}'. Set --version, PUBLISH_VERSION or a manifest version.")]
    Unresolved {
        /// Module artifact id
        module: String,
    },

    /// Version cannot be used as a repository path segment
    #[error("Invalid version '{version}': {reason}")]
    Invalid {
        /// Version string
        version: String,
        /// What makes it unusable
        reason: String,
    },
}

/// External build step errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// Command could not be spawned
    #[error("Failed to run {step} command '{command}': {reason}")]
    SpawnFailed {
        /// Step name (compile, test)
        step: String,
        /// Command line
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Command reported failure
    #[error("{step} step failed for '{module}' (exit code {code:?})")]
    StepFailed {
        /// Step name (compile, test)
        step: String,
        /// Module artifact id
        module: String,
        /// Exit code if any
        code: Option<i32>,
    },

    /// Primary artifact missing after the build
    #[error("Primary artifact '{file}' not found in {dir}")]
    MissingArtifact {
        /// Expected file name
        file: String,
        /// Searched directory
        dir: PathBuf,
    },
}

/// Artifact signing errors
#[derive(Error, Debug)]
pub enum SigningError {
    /// Key material could not be decoded
    #[error("Malformed signing key: {reason}")]
    MalformedKey {
        /// Reason for the error
        reason: String,
    },

    /// Freshly produced signature did not verify
    #[error("Signature verification failed for '{file}'")]
    VerificationFailed {
        /// Artifact file name
        file: String,
    },

    /// Key already released
    #[error("Signing key has already been released")]
    KeyReleased,

    /// Target requires signatures but no signing credentials were supplied
    #[error("Repository target '{target}' requires signed artifacts for release versions")]
    SignatureRequired {
        /// Target name
        target: String,
    },
}

/// Remote repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Credentials rejected
    #[error("Authentication rejected by {endpoint} (HTTP {status})")]
    AuthenticationRejected {
        /// Endpoint URL
        endpoint: String,
        /// HTTP status
        status: u16,
    },

    /// Network failure, timeout or server error
    #[error("Transport failure during {operation}: {reason}")]
    Transport {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },

    /// Staging profile could not be found
    #[error("Staging profile not found: {profile}")]
    StagingProfileNotFound {
        /// Profile id or group used for the lookup
        profile: String,
    },

    /// Request rejected for a non-transient reason
    #[error("{operation} rejected by {endpoint} (HTTP {status}): {body}")]
    Rejected {
        /// Operation that failed
        operation: String,
        /// Endpoint URL
        endpoint: String,
        /// HTTP status
        status: u16,
        /// Response body excerpt
        body: String,
    },

    /// Staging repository close/release failed
    #[error("Failed to {action} staging repository '{repository_id}': {reason}")]
    StagingFailed {
        /// close or release
        action: &'static str,
        /// Staging repository id
        repository_id: String,
        /// Reason for the error
        reason: String,
    },

    /// Response could not be understood
    #[error("Unexpected response from {endpoint}: {reason}")]
    InvalidResponse {
        /// Endpoint URL
        endpoint: String,
        /// Reason for the error
        reason: String,
    },
}

/// Report persistence errors
#[derive(Error, Debug)]
pub enum ReportError {
    /// Report file not found
    #[error("No publish report found at {path}")]
    NotFound {
        /// Report path
        path: PathBuf,
    },

    /// Report format version mismatch
    #[error("Report format mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },

    /// Failed to save report
    #[error("Failed to save report: {reason}")]
    SaveFailed {
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Classify this error into the publishing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReleaseError::Manifest(_)
            | ReleaseError::Descriptor(_)
            | ReleaseError::Version(_)
            | ReleaseError::Cli(_) => ErrorKind::Config,
            ReleaseError::Build(_) => ErrorKind::Build,
            ReleaseError::Signing(_) => ErrorKind::Signing,
            ReleaseError::Repository(e) => match e {
                RepositoryError::AuthenticationRejected { .. } => ErrorKind::Auth,
                RepositoryError::Transport { .. } => ErrorKind::Transport,
                RepositoryError::StagingProfileNotFound { .. } => ErrorKind::Config,
                RepositoryError::StagingFailed { .. } => ErrorKind::Staging,
                RepositoryError::Rejected { .. } | RepositoryError::InvalidResponse { .. } => {
                    ErrorKind::Config
                }
            },
            ReleaseError::Report(_) | ReleaseError::Io(_) | ReleaseError::Json(_) => ErrorKind::Io,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Manifest(ManifestError::NotFound { path }) => vec![
                format!("Create a Publish.toml at {}", path.display()),
                "Point to an existing manifest with --manifest <PATH>".to_string(),
            ],
            ReleaseError::Version(VersionError::Unresolved { .. }) => vec![
                "Pass --version <VERSION> or export PUBLISH_VERSION".to_string(),
                "Set `version` under [project] or the module in Publish.toml".to_string(),
                "Tag HEAD and enable [versioning] git_tags = true".to_string(),
            ],
            ReleaseError::Signing(SigningError::MalformedKey { .. }) => vec![
                "SIGNING_KEY must hold a PEM encoded PKCS#8 Ed25519 private key".to_string(),
                "Check SIGNING_PASSWORD matches the key's passphrase".to_string(),
            ],
            ReleaseError::Signing(SigningError::SignatureRequired { .. }) => vec![
                "Export SIGNING_KEY and SIGNING_PASSWORD".to_string(),
                "Set require_signatures = false on the target to allow unsigned releases"
                    .to_string(),
            ],
            ReleaseError::Repository(RepositoryError::AuthenticationRejected { .. }) => vec![
                "Verify <PREFIX>_USERNAME and <PREFIX>_PASSWORD for the target".to_string(),
                "Use a repository user token instead of an account password".to_string(),
            ],
            ReleaseError::Repository(RepositoryError::StagingProfileNotFound { .. }) => vec![
                "Set <PREFIX>_STAGING_PROFILE_ID or staging_profile_id on the target".to_string(),
                "Make sure the project group matches a staging profile you can deploy to"
                    .to_string(),
            ],
            ReleaseError::Repository(RepositoryError::StagingFailed { repository_id, .. }) => {
                vec![
                    format!(
                        "Artifacts are uploaded but staging repository '{}' is not finalized",
                        repository_id
                    ),
                    "Inspect the repository's activity log, then close or drop it manually"
                        .to_string(),
                ]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Check if this error is recoverable by retrying the same operation
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_recoverable() {
        let transport: ReleaseError = RepositoryError::Transport {
            operation: "upload".to_string(),
            reason: "timed out".to_string(),
        }
        .into();
        assert!(transport.is_recoverable());

        let auth: ReleaseError = RepositoryError::AuthenticationRejected {
            endpoint: "https://repo.example".to_string(),
            status: 401,
        }
        .into();
        assert_eq!(auth.kind(), ErrorKind::Auth);
        assert!(!auth.is_recoverable());

        let profile: ReleaseError = RepositoryError::StagingProfileNotFound {
            profile: "com.example".to_string(),
        }
        .into();
        assert_eq!(profile.kind(), ErrorKind::Config);
        assert!(!profile.is_recoverable());
    }

    #[test]
    fn test_unresolved_version_is_config_error() {
        let err: ReleaseError = VersionError::Unresolved {
            module: "core".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.recovery_suggestions().len() > 1);
    }
}
