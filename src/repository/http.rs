//! Nexus-style repository client over HTTP.
//!
//! Staged releases use the Nexus staging REST API under the target's release URL
//! (`staging/profiles`, `staging/profiles/{id}/start`, `staging/deployByRepositoryId`,
//! `staging/bulk/close`, `staging/bulk/promote`). Direct uploads are plain `PUT`s below
//! the destination URL.

use super::client::{RepositoryClient, RepositoryConnector, StagingRepository, UploadDestination};
use super::RepositoryTarget;
use crate::artifact::ArtifactFile;
use crate::credentials::RepositoryAuth;
use crate::error::{ReleaseError, RepositoryError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Delay between staging state polls after a close request
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Polls before a close is reported as stuck
pub const DEFAULT_MAX_POLLS: u32 = 120;

const USER_AGENT: &str = concat!("kodegen_publish/", env!("CARGO_PKG_VERSION"));

/// Creates [`HttpRepositoryClient`]s with a shared timeout
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
    poll_interval: Duration,
    max_polls: u32,
}

impl HttpConnector {
    /// Connector whose clients bound every request by `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Override staging state polling
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }
}

impl RepositoryConnector for HttpConnector {
    fn connect(
        &self,
        target: &RepositoryTarget,
        auth: &RepositoryAuth,
    ) -> Result<Arc<dyn RepositoryClient>> {
        let client = HttpRepositoryClient::new(target, auth.clone(), self.timeout)?
            .with_polling(self.poll_interval, self.max_polls);
        Ok(Arc::new(client))
    }
}

/// Repository session authenticated with HTTP basic auth
pub struct HttpRepositoryClient {
    http: Client,
    staging_base: Url,
    auth: RepositoryAuth,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct StagingProfile {
    id: String,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartedRepository {
    staged_repository_id: String,
}

#[derive(Deserialize)]
struct RepositoryState {
    #[serde(rename = "type")]
    state: String,
    #[serde(default)]
    transitioning: bool,
}

impl HttpRepositoryClient {
    /// Create a client for `target`
    pub fn new(target: &RepositoryTarget, auth: RepositoryAuth, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RepositoryError::Transport {
                operation: "create HTTP client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            staging_base: target.release_url.clone(),
            auth,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
        })
    }

    /// Override staging state polling
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn staging_url(&self, path: &str) -> Result<Url> {
        join(&self.staging_base, path)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(&self.auth.username, Some(self.auth.password.as_str()))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| transport(operation, &e))?;
        check_status(operation, response).await
    }

    async fn bulk_action(
        &self,
        action: &'static str,
        endpoint: &str,
        repository: &StagingRepository,
        body: serde_json::Value,
    ) -> Result<()> {
        let url = self.staging_url(endpoint)?;
        let operation = format!("{} staging repository {}", action, repository.id);
        self.send(&operation, self.request(Method::POST, url).json(&body))
            .await
            .map_err(|e| staging_failure(action, repository, e))?;
        Ok(())
    }

    async fn repository_state(&self, repository: &StagingRepository) -> Result<RepositoryState> {
        let url = self.staging_url(&format!("staging/repository/{}", repository.id))?;
        let operation = format!("poll staging repository {}", repository.id);
        self.send(&operation, self.request(Method::GET, url.clone()))
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(&url, &e))
    }

    /// Whether the server already closed the repository or is closing it
    async fn is_closing(&self, repository: &StagingRepository) -> bool {
        matches!(
            self.repository_state(repository).await,
            Ok(state) if state.transitioning || state.state == "closed"
        )
    }
}

#[async_trait]
impl RepositoryClient for HttpRepositoryClient {
    async fn find_staging_profile(&self, group: &str) -> Result<String> {
        let url = self.staging_url("staging/profiles")?;
        let profiles: DataEnvelope<Vec<StagingProfile>> = self
            .send("list staging profiles", self.request(Method::GET, url.clone()))
            .await?
            .json()
            .await
            .map_err(|e| invalid_response(&url, &e))?;

        // Most specific profile whose name is the group or one of its parents
        profiles
            .data
            .into_iter()
            .filter(|p| group == p.name || group.starts_with(&format!("{}.", p.name)))
            .max_by_key(|p| p.name.len())
            .map(|p| {
                log::info!("Using staging profile {} ({}) for {}", p.id, p.name, group);
                p.id
            })
            .ok_or_else(|| {
                RepositoryError::StagingProfileNotFound {
                    profile: group.to_string(),
                }
                .into()
            })
    }

    async fn open_staging(&self, profile_id: &str, description: &str) -> Result<StagingRepository> {
        let url = self.staging_url(&format!("staging/profiles/{}/start", profile_id))?;
        let body = json!({ "data": { "description": description } });

        let response = self
            .send(
                "open staging repository",
                self.request(Method::POST, url.clone()).json(&body),
            )
            .await
            .map_err(|e| match e {
                ReleaseError::Repository(RepositoryError::Rejected { status: 404, .. }) => {
                    RepositoryError::StagingProfileNotFound {
                        profile: profile_id.to_string(),
                    }
                    .into()
                }
                other => other,
            })?;

        let started: DataEnvelope<StartedRepository> = response
            .json()
            .await
            .map_err(|e| invalid_response(&url, &e))?;

        Ok(StagingRepository {
            id: started.data.staged_repository_id,
            profile_id: profile_id.to_string(),
        })
    }

    async fn upload(
        &self,
        destination: &UploadDestination,
        path: &str,
        file: &ArtifactFile,
    ) -> Result<()> {
        let url = match destination {
            UploadDestination::Direct(base) => join(base, &format!("{}/{}", path, file.file_name))?,
            UploadDestination::Staging(repository) => self.staging_url(&format!(
                "staging/deployByRepositoryId/{}/{}/{}",
                repository.id, path, file.file_name
            ))?,
        };

        let operation = format!("upload {}", file.file_name);
        self.send(
            &operation,
            self.request(Method::PUT, url).body(file.content.clone()),
        )
        .await?;
        log::debug!("Uploaded {} ({} bytes)", file.file_name, file.content.len());
        Ok(())
    }

    async fn close_staging(&self, repository: &StagingRepository, description: &str) -> Result<()> {
        let body = json!({
            "data": {
                "stagedRepositoryIds": [repository.id],
                "description": description,
            }
        });
        let Err(error) = self
            .bulk_action("close", "staging/bulk/close", repository, body)
            .await
        else {
            return Ok(());
        };

        // A close that reached the server before a lost response is rejected when resent
        if matches!(
            error,
            ReleaseError::Repository(RepositoryError::StagingFailed { .. })
        ) && self.is_closing(repository).await
        {
            log::info!(
                "Staging repository {} is already closing, close request not needed",
                repository.id
            );
            return Ok(());
        }
        Err(error)
    }

    async fn wait_until_closed(&self, repository: &StagingRepository) -> Result<()> {
        for poll in 0..self.max_polls {
            let state = self.repository_state(repository).await?;

            if !state.transitioning {
                if state.state == "closed" {
                    return Ok(());
                }
                return Err(RepositoryError::StagingFailed {
                    action: "close",
                    repository_id: repository.id.clone(),
                    reason: format!(
                        "repository is '{}' after close; check its activity for failed rules",
                        state.state
                    ),
                }
                .into());
            }

            log::debug!(
                "Staging repository {} still transitioning (poll {}/{})",
                repository.id,
                poll + 1,
                self.max_polls
            );
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(RepositoryError::StagingFailed {
            action: "close",
            repository_id: repository.id.clone(),
            reason: format!("still transitioning after {} polls", self.max_polls),
        }
        .into())
    }

    async fn release_staging(
        &self,
        repository: &StagingRepository,
        description: &str,
    ) -> Result<()> {
        let body = json!({
            "data": {
                "stagedRepositoryIds": [repository.id],
                "description": description,
                "autoDropAfterRelease": true,
            }
        });
        self.bulk_action("release", "staging/bulk/promote", repository, body)
            .await
    }
}

fn join(base: &Url, path: &str) -> Result<Url> {
    base.join(path.trim_start_matches('/')).map_err(|e| {
        RepositoryError::InvalidResponse {
            endpoint: base.to_string(),
            reason: format!("cannot build URL for '{}': {}", path, e),
        }
        .into()
    })
}

/// Map a response status onto the error taxonomy
async fn check_status(operation: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let endpoint = response.url().to_string();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(RepositoryError::AuthenticationRejected {
                endpoint,
                status: status.as_u16(),
            }
            .into())
        }
        s if s.is_server_error()
            || s == StatusCode::REQUEST_TIMEOUT
            || s == StatusCode::TOO_MANY_REQUESTS =>
        {
            Err(RepositoryError::Transport {
                operation: operation.to_string(),
                reason: format!("{} returned HTTP {}", endpoint, s.as_u16()),
            }
            .into())
        }
        s => {
            let body = response.text().await.unwrap_or_default();
            Err(RepositoryError::Rejected {
                operation: operation.to_string(),
                endpoint,
                status: s.as_u16(),
                body: body.chars().take(512).collect(),
            }
            .into())
        }
    }
}

fn transport(operation: &str, error: &reqwest::Error) -> ReleaseError {
    let reason = if error.is_timeout() {
        format!("timed out: {}", error)
    } else {
        error.to_string()
    };
    RepositoryError::Transport {
        operation: operation.to_string(),
        reason,
    }
    .into()
}

fn invalid_response(url: &Url, error: &reqwest::Error) -> ReleaseError {
    RepositoryError::InvalidResponse {
        endpoint: url.to_string(),
        reason: error.to_string(),
    }
    .into()
}

/// Report any non-transport failure of a close/release call as a staging failure
fn staging_failure(
    action: &'static str,
    repository: &StagingRepository,
    error: ReleaseError,
) -> ReleaseError {
    match error {
        ReleaseError::Repository(RepositoryError::Rejected { status, body, .. }) => {
            RepositoryError::StagingFailed {
                action,
                repository_id: repository.id.clone(),
                reason: format!("HTTP {}: {}", status, body),
            }
            .into()
        }
        other => other,
    }
}
