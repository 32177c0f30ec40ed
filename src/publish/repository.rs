//! Publishing prepared modules to one repository target.
//!
//! Snapshots and unstaged releases are uploaded straight to the endpoint, module by module.
//! Staged releases of every participating module share one staging repository: uploads run
//! concurrently, then all of them are joined before the repository is closed. The close is
//! only requested when every participant uploaded successfully.

use super::prepare::PreparedModule;
use super::result::{PublishResult, Stage};
use crate::config::RetryConfig;
use crate::credentials::Credentials;
use crate::error::{ErrorKind, ReleaseError, Result, SigningError};
use crate::repository::{
    RepositoryClient, RepositoryConnector, RepositoryTarget, StagingRepository, UploadDestination,
    retry_with_backoff,
};
use crate::version::Channel;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Uploads prepared modules to repository targets
#[derive(Clone)]
pub struct RepositoryPublisher {
    connector: Arc<dyn RepositoryConnector>,
    retry: RetryConfig,
    max_concurrent_modules: usize,
}

impl RepositoryPublisher {
    /// Create a publisher opening sessions through `connector`
    pub fn new(
        connector: Arc<dyn RepositoryConnector>,
        retry: RetryConfig,
        max_concurrent_modules: usize,
    ) -> Self {
        Self {
            connector,
            retry,
            max_concurrent_modules: max_concurrent_modules.max(1),
        }
    }

    /// Publish a single module to `target`
    pub async fn publish(
        &self,
        module: Arc<PreparedModule>,
        credentials: &Credentials,
        target: &RepositoryTarget,
    ) -> PublishResult {
        self.publish_modules(vec![module], credentials, target)
            .await
            .pop()
            .unwrap_or_else(|| PublishResult::skipped("nothing to publish"))
    }

    /// Publish every module to `target`. Results are in the order of `modules`.
    pub async fn publish_modules(
        &self,
        modules: Vec<Arc<PreparedModule>>,
        credentials: &Credentials,
        target: &RepositoryTarget,
    ) -> Vec<PublishResult> {
        let Some(auth) = credentials.repository_auth() else {
            log::info!(
                "No {}_USERNAME/{}_PASSWORD set, skipping target '{}'",
                target.env_prefix,
                target.env_prefix,
                target.name
            );
            let reason = format!("no credentials for target '{}'", target.name);
            return modules
                .iter()
                .map(|_| PublishResult::skipped(reason.clone()))
                .collect();
        };

        let mut results: Vec<Option<PublishResult>> = vec![None; modules.len()];
        let mut direct = Vec::new();
        let mut staged = Vec::new();

        for (index, module) in modules.iter().enumerate() {
            let channel = module.version.channel;
            if channel == Channel::Release && target.require_signatures && !module.signing.is_signed() {
                let error: ReleaseError = SigningError::SignatureRequired {
                    target: target.name.clone(),
                }
                .into();
                log::error!("{}: {}", module.coordinate(), error);
                results[index] = Some(PublishResult::failed(Stage::Signing, &error));
            } else if target.uses_staging(channel) {
                staged.push(index);
            } else {
                direct.push(index);
            }
        }

        if !direct.is_empty() || !staged.is_empty() {
            match self.connector.connect(target, &auth) {
                Ok(client) => {
                    for (index, result) in self.publish_direct(&client, &modules, &direct, target).await {
                        results[index] = Some(result);
                    }
                    for (index, result) in self
                        .publish_staged(&client, &modules, &staged, credentials, target)
                        .await
                    {
                        results[index] = Some(result);
                    }
                }
                Err(e) => {
                    for &index in direct.iter().chain(&staged) {
                        results[index] = Some(PublishResult::failed(Stage::Session, &e));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| PublishResult::skipped("not scheduled")))
            .collect()
    }

    async fn publish_direct(
        &self,
        client: &Arc<dyn RepositoryClient>,
        modules: &[Arc<PreparedModule>],
        indices: &[usize],
        target: &RepositoryTarget,
    ) -> Vec<(usize, PublishResult)> {
        let uploads = self
            .upload_concurrently(client, modules, indices, |module| {
                UploadDestination::Direct(target.endpoint_for(module.version.channel).clone())
            })
            .await;

        uploads
            .into_iter()
            .map(|(index, outcome)| {
                let module = &modules[index];
                let result = match outcome {
                    Ok(()) => published(module, target, None),
                    Err(e) => PublishResult::failed(Stage::Upload, &e),
                };
                (index, result)
            })
            .collect()
    }

    async fn publish_staged(
        &self,
        client: &Arc<dyn RepositoryClient>,
        modules: &[Arc<PreparedModule>],
        indices: &[usize],
        credentials: &Credentials,
        target: &RepositoryTarget,
    ) -> Vec<(usize, PublishResult)> {
        let Some(&first) = indices.first() else {
            return Vec::new();
        };

        let description = staging_description(modules, indices);
        let repository = match self
            .open_staging(client, credentials, target, &modules[first].descriptor.group, &description)
            .await
        {
            Ok(repository) => repository,
            Err(e) => {
                log::error!("Could not open staging repository on '{}': {}", target.name, e);
                return indices
                    .iter()
                    .map(|&i| (i, PublishResult::failed(Stage::Session, &e)))
                    .collect();
            }
        };
        log::info!(
            "Opened staging repository {} on '{}' for {} module(s)",
            repository.id,
            target.name,
            indices.len()
        );

        // Barrier: every participant's upload finishes before close is considered
        let uploads = self
            .upload_concurrently(client, modules, indices, |_| {
                UploadDestination::Staging(repository.clone())
            })
            .await;

        let failed: Vec<&str> = uploads
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(index, _)| modules[*index].descriptor.artifact_id.as_str())
            .collect();

        if !failed.is_empty() {
            log::error!(
                "Staging repository {} left open: upload failed for {}",
                repository.id,
                failed.join(", ")
            );
            let message = format!(
                "staging repository {} not closed: upload failed for {}",
                repository.id,
                failed.join(", ")
            );
            return uploads
                .into_iter()
                .map(|(index, outcome)| {
                    let result = match outcome {
                        Err(e) => PublishResult::failed(Stage::Upload, &e),
                        Ok(()) => PublishResult::Failed {
                            stage: Stage::StagingClose,
                            kind: ErrorKind::Staging,
                            message: message.clone(),
                        },
                    };
                    (index, result)
                })
                .collect();
        }

        if let Err((stage, error)) = self.finalize(client, &repository, target, &description).await {
            log::error!(
                "Staging repository {} uploaded but not finalized: {}",
                repository.id,
                error
            );
            return indices
                .iter()
                .map(|&i| (i, PublishResult::failed(stage, &error)))
                .collect();
        }

        indices
            .iter()
            .map(|&i| (i, published(&modules[i], target, Some(&repository))))
            .collect()
    }

    async fn open_staging(
        &self,
        client: &Arc<dyn RepositoryClient>,
        credentials: &Credentials,
        target: &RepositoryTarget,
        group: &str,
        description: &str,
    ) -> Result<StagingRepository> {
        let profile_id = match credentials
            .staging_profile_id
            .clone()
            .or_else(|| target.staging_profile_id.clone())
        {
            Some(id) => id,
            None => {
                retry_with_backoff(
                    || client.find_staging_profile(group),
                    self.retry.staging_operations,
                    "staging profile lookup",
                    &self.retry,
                )
                .await?
            }
        };

        retry_with_backoff(
            || client.open_staging(&profile_id, description),
            self.retry.staging_operations,
            "open staging repository",
            &self.retry,
        )
        .await
    }

    async fn finalize(
        &self,
        client: &Arc<dyn RepositoryClient>,
        repository: &StagingRepository,
        target: &RepositoryTarget,
        description: &str,
    ) -> std::result::Result<(), (Stage, ReleaseError)> {
        // Request and wait are retried separately so a failed poll never resends the close
        retry_with_backoff(
            || client.close_staging(repository, description),
            self.retry.staging_operations,
            "close staging repository",
            &self.retry,
        )
        .await
        .map_err(|e| (Stage::StagingClose, e))?;
        retry_with_backoff(
            || client.wait_until_closed(repository),
            self.retry.staging_operations,
            "wait for staging repository close",
            &self.retry,
        )
        .await
        .map_err(|e| (Stage::StagingClose, e))?;
        log::info!("Closed staging repository {}", repository.id);

        if target.release_after_close {
            retry_with_backoff(
                || client.release_staging(repository, description),
                self.retry.staging_operations,
                "release staging repository",
                &self.retry,
            )
            .await
            .map_err(|e| (Stage::StagingRelease, e))?;
            log::info!("Released staging repository {}", repository.id);
        }

        Ok(())
    }

    /// Upload each module's plan in its own task, bounded by the module semaphore,
    /// and wait for all of them.
    async fn upload_concurrently<D>(
        &self,
        client: &Arc<dyn RepositoryClient>,
        modules: &[Arc<PreparedModule>],
        indices: &[usize],
        destination: D,
    ) -> Vec<(usize, Result<()>)>
    where
        D: Fn(&PreparedModule) -> UploadDestination,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_modules));
        let mut tasks = JoinSet::new();

        for &index in indices {
            let module = Arc::clone(&modules[index]);
            let client = Arc::clone(client);
            let destination = destination(module.as_ref());
            let retry = self.retry.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, upload_module(client, &module, &destination, &retry).await)
            });
        }

        let mut outcomes = Vec::with_capacity(indices.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => log::error!("Upload task aborted: {}", e),
            }
        }

        // Aborted tasks still need an outcome
        for &index in indices {
            if !outcomes.iter().any(|(i, _)| *i == index) {
                let error = ReleaseError::Io(std::io::Error::other("upload task aborted"));
                outcomes.push((index, Err(error)));
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes
    }
}

/// Upload a module's files in plan order, retrying each file on transport errors
async fn upload_module(
    client: Arc<dyn RepositoryClient>,
    module: &PreparedModule,
    destination: &UploadDestination,
    retry: &RetryConfig,
) -> Result<()> {
    let path = module.repository_path();
    let plan = module.upload_plan();
    log::info!(
        "Uploading {} file(s) for {} to {}",
        plan.len(),
        module.coordinate(),
        destination
    );

    for file in &plan {
        let operation = format!("upload {}", file.file_name);
        retry_with_backoff(
            || client.upload(destination, &path, file),
            retry.file_uploads,
            &operation,
            retry,
        )
        .await?;
    }
    Ok(())
}

fn published(
    module: &PreparedModule,
    target: &RepositoryTarget,
    repository: Option<&StagingRepository>,
) -> PublishResult {
    let result = PublishResult::Published {
        coordinate: module.coordinate(),
        endpoint: target.endpoint_for(module.version.channel).to_string(),
        signed: module.signing.is_signed(),
        staging_repository: repository.map(|r| r.id.clone()),
    };
    log::info!("{}: {}", target.name, result);
    result
}

fn staging_description(modules: &[Arc<PreparedModule>], indices: &[usize]) -> String {
    let coordinates: Vec<String> = indices.iter().map(|&i| modules[i].coordinate()).collect();
    format!("kodegen_publish: {}", coordinates.join(", "))
}
