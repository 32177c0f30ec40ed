//! Publish outcomes per module and target.

use crate::error::{ErrorKind, ReleaseError};
use serde::{Deserialize, Serialize};

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Module descriptor assembly
    Descriptor,
    /// Version resolution
    Version,
    /// External compile/test and artifact collection
    Build,
    /// Signing or signature policy
    Signing,
    /// Opening the authenticated session or staging repository
    Session,
    /// File uploads
    Upload,
    /// Closing the staging repository
    StagingClose,
    /// Releasing the closed staging repository
    StagingRelease,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Descriptor => "descriptor",
            Stage::Version => "version",
            Stage::Build => "build",
            Stage::Signing => "signing",
            Stage::Session => "session",
            Stage::Upload => "upload",
            Stage::StagingClose => "staging close",
            Stage::StagingRelease => "staging release",
        };
        f.write_str(name)
    }
}

/// Outcome of publishing one module to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishResult {
    /// Every file uploaded (and, for staged targets, the staging repository finalized)
    Published {
        /// `group:artifact:version`
        coordinate: String,
        /// Endpoint the module was published to
        endpoint: String,
        /// Whether detached signatures were uploaded
        signed: bool,
        /// Staging repository id for staged releases
        #[serde(default, skip_serializing_if = "Option::is_none")]
        staging_repository: Option<String>,
    },
    /// Deliberate no-op, e.g. no credentials for the target
    Skipped {
        /// Why nothing was done
        reason: String,
    },
    /// The module did not reach the target
    Failed {
        /// Stage that failed
        stage: Stage,
        /// Error classification
        kind: ErrorKind,
        /// Error message
        message: String,
    },
}

impl PublishResult {
    /// Failure at `stage` caused by `error`
    pub fn failed(stage: Stage, error: &ReleaseError) -> Self {
        PublishResult::Failed {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// Skip with a reason
    pub fn skipped(reason: impl Into<String>) -> Self {
        PublishResult::Skipped {
            reason: reason.into(),
        }
    }

    /// Whether the module reached the target
    pub fn is_published(&self) -> bool {
        matches!(self, PublishResult::Published { .. })
    }

    /// Whether this outcome should fail the run
    pub fn is_failure(&self) -> bool {
        matches!(self, PublishResult::Failed { .. })
    }

    /// Failure stage, if failed
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PublishResult::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Failure kind, if failed
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PublishResult::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl std::fmt::Display for PublishResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishResult::Published {
                coordinate,
                endpoint,
                signed,
                ..
            } => write!(
                f,
                "published {} to {} ({})",
                coordinate,
                endpoint,
                if *signed { "signed" } else { "unsigned" }
            ),
            PublishResult::Skipped { reason } => write!(f, "skipped: {}", reason),
            PublishResult::Failed {
                stage,
                kind,
                message,
            } => write!(f, "{} at {} stage: {}", kind, stage, message),
        }
    }
}

/// Result for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    /// Target name
    pub target: String,
    /// What happened
    pub result: PublishResult,
}
