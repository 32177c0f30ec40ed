//! Repository client abstraction.
//!
//! The publisher talks to remote repositories only through [`RepositoryClient`], which
//! keeps the pipeline testable with an in-memory client and lets the staging barrier be
//! observed call by call.

use super::RepositoryTarget;
use crate::artifact::ArtifactFile;
use crate::credentials::RepositoryAuth;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Staging repository opened for one publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRepository {
    /// Repository id assigned by the server
    pub id: String,
    /// Profile the repository belongs to
    pub profile_id: String,
}

/// Where a module's files are uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDestination {
    /// Straight into a repository (snapshots, unstaged releases)
    Direct(Url),
    /// Into an open staging repository
    Staging(StagingRepository),
}

impl std::fmt::Display for UploadDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadDestination::Direct(url) => write!(f, "{}", url),
            UploadDestination::Staging(repo) => write!(f, "staging repository {}", repo.id),
        }
    }
}

/// Authenticated session against one repository target
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Find the staging profile id matching a group id
    async fn find_staging_profile(&self, group: &str) -> Result<String>;

    /// Open a staging repository in `profile_id`
    async fn open_staging(&self, profile_id: &str, description: &str) -> Result<StagingRepository>;

    /// Upload one file to `path` (repository directory, e.g. `com/example/core/1.0.0`)
    async fn upload(
        &self,
        destination: &UploadDestination,
        path: &str,
        file: &ArtifactFile,
    ) -> Result<()>;

    /// Request that a staging repository be closed, making its content immutable and
    /// validated. Returns once the request is accepted; see [`Self::wait_until_closed`].
    async fn close_staging(&self, repository: &StagingRepository, description: &str) -> Result<()>;

    /// Wait for a close request to finish. Safe to call again after a transient failure.
    async fn wait_until_closed(&self, repository: &StagingRepository) -> Result<()>;

    /// Release a closed staging repository to the public release repository
    async fn release_staging(
        &self,
        repository: &StagingRepository,
        description: &str,
    ) -> Result<()>;
}

/// Opens authenticated sessions for repository targets
pub trait RepositoryConnector: Send + Sync {
    /// Create a client for `target` using `auth`
    fn connect(
        &self,
        target: &RepositoryTarget,
        auth: &RepositoryAuth,
    ) -> Result<Arc<dyn RepositoryClient>>;
}
