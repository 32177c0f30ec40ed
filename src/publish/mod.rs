//! Release publishing pipeline.
//!
//! A run has two phases. First every selected module goes through its local stages
//! (descriptor, version, build, artifacts, signing) concurrently; failures there never reach
//! the network. Then each repository target receives every prepared module, with staged
//! releases sharing one staging repository per target.

mod prepare;
mod repository;
mod result;

pub use prepare::{ModuleFailure, PrepareContext, PreparedModule};
pub use repository::RepositoryPublisher;
pub use result::{PublishResult, Stage, TargetOutcome};

use crate::build::BuildStep;
use crate::config::{ModuleConfig, PublishConfig};
use crate::credentials::{Credentials, SigningCredentials};
use crate::error::Result;
use crate::report::{ModuleReport, PublishReport};
use crate::repository::{RepositoryConnector, RepositoryTarget};
use crate::version;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Which modules and targets a run covers; empty lists mean all
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Module artifact ids
    pub modules: Vec<String>,
    /// Target names
    pub targets: Vec<String>,
}

/// Runs the whole pipeline for a project
pub struct Publisher {
    config: Arc<PublishConfig>,
    repository: RepositoryPublisher,
    signing: Mutex<Option<SigningCredentials>>,
}

impl Publisher {
    /// Create a publisher using `connector` for repository sessions.
    ///
    /// The signing key and passphrase are moved out of `config.env` here; the rest of
    /// the environment never sees them again.
    pub fn new(mut config: PublishConfig, connector: Arc<dyn RepositoryConnector>) -> Self {
        let signing = SigningCredentials::take_from_env(&mut config.env);
        let repository = RepositoryPublisher::new(
            connector,
            config.retry.clone(),
            config.max_concurrent_uploads,
        );
        Self {
            config: Arc::new(config),
            repository,
            signing: Mutex::new(Some(signing)),
        }
    }

    /// Configuration this publisher runs with
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Whether signing key material is still held, i.e. no run has consumed it yet
    pub fn holds_signing_key(&self) -> bool {
        self.signing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(SigningCredentials::is_present)
    }

    /// Resolve the selected targets against the environment.
    ///
    /// Fails on unknown names or invalid URLs, before anything else happens.
    pub fn targets(&self, names: &[String]) -> Result<Vec<RepositoryTarget>> {
        self.config
            .manifest
            .select_targets(names)?
            .into_iter()
            .map(|t| RepositoryTarget::from_config(t, &self.config.env))
            .collect()
    }

    /// Run the pipeline and return the report.
    ///
    /// Selection and target errors are returned as `Err`; everything that goes wrong for an
    /// individual module or target is recorded in the report instead. The signing key is
    /// handed to the first run only and is wiped once its local stages end, so a second
    /// run on the same publisher produces unsigned artifacts.
    pub async fn run(&self, selection: &Selection) -> Result<PublishReport> {
        let mut report = PublishReport::new();
        let modules: Vec<ModuleConfig> = self
            .config
            .manifest
            .select_modules(&selection.modules)?
            .into_iter()
            .cloned()
            .collect();
        let targets = self.targets(&selection.targets)?;

        let signing = self
            .signing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        let context = Arc::new(self.prepare_context(signing).await);
        // Every clone of the context, and the key with it, is dropped when this returns
        let prepared = prepare_all(context, modules).await;

        let ready: Vec<Arc<PreparedModule>> = prepared
            .iter()
            .filter_map(|p| p.as_ref().ok().cloned())
            .collect();

        let mut per_target = Vec::with_capacity(targets.len());
        for target in &targets {
            let credentials = Credentials::from_env(&self.config.env, &target.env_prefix);
            log::info!(
                "Publishing {} module(s) to '{}'",
                ready.len(),
                target.name
            );
            let results = self
                .repository
                .publish_modules(ready.clone(), &credentials, target)
                .await;
            per_target.push(results);
        }

        let mut ready_index = 0;
        for outcome in prepared {
            let module_report = match outcome {
                Ok(module) => {
                    let results = targets
                        .iter()
                        .zip(&per_target)
                        .map(|(target, results)| TargetOutcome {
                            target: target.name.clone(),
                            result: results[ready_index].clone(),
                        })
                        .collect();
                    ready_index += 1;
                    ModuleReport {
                        module: module.descriptor.artifact_id.clone(),
                        version: Some(module.version.raw.clone()),
                        channel: Some(module.version.channel),
                        signed: module.signing.is_signed(),
                        results,
                    }
                }
                Err(failure) => ModuleReport {
                    results: targets
                        .iter()
                        .map(|target| TargetOutcome {
                            target: target.name.clone(),
                            result: PublishResult::failed(failure.stage, &failure.error),
                        })
                        .collect(),
                    version: failure.version.as_ref().map(|v| v.raw.clone()),
                    channel: failure.version.as_ref().map(|v| v.channel),
                    module: failure.module,
                    signed: false,
                },
            };
            report.modules.push(module_report);
        }

        report.finish();
        log::info!("{}", report.summary());
        Ok(report)
    }

    async fn prepare_context(&self, signing: SigningCredentials) -> PrepareContext {
        let manifest = &self.config.manifest;

        let head_tag = if manifest.versioning.git_tags && self.config.version_override.is_none() {
            version::git::head_tag(&manifest.root).await
        } else {
            None
        };

        let build_steps = if self.config.skip_build {
            log::info!("Skipping external build steps");
            Vec::new()
        } else {
            BuildStep::from_config(&manifest.build)
        };

        PrepareContext {
            project: manifest.project.clone(),
            versioning: manifest.versioning.clone(),
            version_override: self.config.version_override.clone(),
            head_tag,
            root: manifest.root.clone(),
            build_steps,
            signing,
        }
    }
}

/// Prepare modules concurrently; results keep the order of `modules`
async fn prepare_all(
    context: Arc<PrepareContext>,
    modules: Vec<ModuleConfig>,
) -> Vec<std::result::Result<Arc<PreparedModule>, ModuleFailure>> {
    let names: Vec<String> = modules.iter().map(|m| m.artifact_id.clone()).collect();
    let mut tasks = JoinSet::new();

    for (index, module) in modules.into_iter().enumerate() {
        let context = Arc::clone(&context);
        tasks.spawn(async move { (index, context.prepare(&module).await.map(Arc::new)) });
    }

    let mut slots: Vec<Option<std::result::Result<Arc<PreparedModule>, ModuleFailure>>> =
        names.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => slots[index] = Some(outcome),
            Err(e) => log::error!("Module preparation task aborted: {}", e),
        }
    }

    slots
        .into_iter()
        .zip(names)
        .map(|(slot, module)| {
            slot.unwrap_or_else(|| {
                Err(ModuleFailure {
                    module,
                    version: None,
                    stage: Stage::Build,
                    error: std::io::Error::other("module preparation aborted").into(),
                })
            })
        })
        .collect()
}
