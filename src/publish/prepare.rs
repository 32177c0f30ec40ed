//! Local stages of a module pipeline: descriptor, version, build, artifacts, signing.
//!
//! Nothing here touches the network. A module that fails any of these stages never reaches
//! a repository client.

use super::result::Stage;
use crate::artifact::{ArtifactFile, ArtifactSet};
use crate::build::{self, BuildStep};
use crate::config::{ModuleConfig, ProjectConfig, VersioningConfig};
use crate::credentials::SigningCredentials;
use crate::descriptor::{self, ModuleDescriptor};
use crate::error::ReleaseError;
use crate::signing::{Signer, SigningOutcome};
use crate::version::{ResolvedVersion, VersionResolver};
use std::path::PathBuf;

/// A module ready to be uploaded
#[derive(Debug, Clone)]
pub struct PreparedModule {
    /// Descriptor built from project metadata
    pub descriptor: ModuleDescriptor,
    /// Resolved version and channel
    pub version: ResolvedVersion,
    /// Collected artifacts including the rendered POM
    pub artifacts: ArtifactSet,
    /// Signatures, if signing credentials were supplied
    pub signing: SigningOutcome,
}

impl PreparedModule {
    /// `group:artifact:version`
    pub fn coordinate(&self) -> String {
        self.descriptor.coordinate(&self.version.raw)
    }

    /// Repository directory of this module version
    pub fn repository_path(&self) -> String {
        self.descriptor.repository_path(&self.version.raw)
    }

    /// Files to upload, in order
    pub fn upload_plan(&self) -> Vec<ArtifactFile> {
        self.artifacts.upload_plan(self.signing.signatures())
    }
}

/// A module that stopped before reaching any repository
#[derive(Debug)]
pub struct ModuleFailure {
    /// Module artifact id
    pub module: String,
    /// Version, when it was resolved before the failure
    pub version: Option<ResolvedVersion>,
    /// Failing stage
    pub stage: Stage,
    /// Cause
    pub error: ReleaseError,
}

/// Inputs shared by every module's local stages.
///
/// Holds the run's only copy of the signing key; dropping the context wipes it.
#[derive(Debug)]
pub struct PrepareContext {
    /// `[project]` metadata
    pub project: ProjectConfig,
    /// Versioning rules
    pub versioning: VersioningConfig,
    /// Explicit version override
    pub version_override: Option<String>,
    /// Exact git tag on HEAD, if looked up
    pub head_tag: Option<String>,
    /// Project root
    pub root: PathBuf,
    /// External build steps; empty when skipped
    pub build_steps: Vec<BuildStep>,
    /// Signing key and passphrase
    pub signing: SigningCredentials,
}

impl PrepareContext {
    /// Run the local stages for `module`
    pub async fn prepare(&self, module: &ModuleConfig) -> Result<PreparedModule, ModuleFailure> {
        let fail = |stage: Stage, version: Option<&ResolvedVersion>, error: ReleaseError| {
            log::error!("{} failed at {} stage: {}", module.artifact_id, stage, error);
            ModuleFailure {
                module: module.artifact_id.clone(),
                version: version.cloned(),
                stage,
                error,
            }
        };

        let descriptor = ModuleDescriptor::build(&self.project, module)
            .map_err(|e| fail(Stage::Descriptor, None, e))?;

        let version = VersionResolver::new(
            &self.versioning,
            self.version_override.as_deref(),
            self.project.version.as_deref(),
        )
        .with_head_tag(self.head_tag.as_deref())
        .resolve(module)
        .map_err(|e| fail(Stage::Version, None, e))?;

        let pom = descriptor::render_pom(&descriptor, &version.raw)
            .map_err(|e| fail(Stage::Descriptor, Some(&version), e))?;

        build::run_steps(&self.build_steps, &module.artifact_id, &self.root)
            .await
            .map_err(|e| fail(Stage::Build, Some(&version), e))?;

        let artifacts_dir = module.artifacts_dir(&self.root);
        let artifacts = ArtifactSet::collect(&descriptor, &version.raw, &artifacts_dir)
            .await
            .map_err(|e| fail(Stage::Build, Some(&version), e))?
            .with_descriptor(&descriptor, &version.raw, pom);

        let signing = Signer::sign(&artifacts, &self.signing)
            .map_err(|e| fail(Stage::Signing, Some(&version), e))?;

        log::info!(
            "Prepared {} ({} channel, {} files, {})",
            descriptor.coordinate(&version.raw),
            version.channel,
            artifacts.files().len(),
            if signing.is_signed() { "signed" } else { "unsigned" }
        );

        Ok(PreparedModule {
            descriptor,
            version,
            artifacts,
            signing,
        })
    }
}
