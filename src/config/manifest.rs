//! Publish.toml structure and loading.
#![allow(dead_code)] // Public API - fields may be read by external consumers

use crate::error::{ManifestError, ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default manifest file name
pub const MANIFEST_FILE_NAME: &str = "Publish.toml";

/// Parsed Publish.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectManifest {
    /// Shared project metadata
    pub project: ProjectConfig,
    /// Publishable modules
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
    /// Remote repository targets (defaults to Sonatype OSSRH when empty)
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    /// Version resolution settings
    #[serde(default)]
    pub versioning: VersioningConfig,
    /// External compile/test commands
    #[serde(default)]
    pub build: BuildConfig,
    /// Directory containing the manifest; relative paths resolve against it
    #[serde(skip)]
    pub root: PathBuf,
}

/// Project-wide metadata shared by every module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Maven group id
    pub group: Option<String>,
    /// Fallback description for modules without their own
    pub description: Option<String>,
    /// Project home page
    pub url: Option<String>,
    /// Project version
    pub version: Option<String>,
    /// Owning organization
    pub organization: Option<OrganizationConfig>,
    /// License
    pub license: Option<LicenseConfig>,
    /// Source control coordinates
    pub scm: Option<ScmConfig>,
    /// Issue tracker
    pub issues: Option<IssuesConfig>,
    /// Developers
    #[serde(default)]
    pub developers: Vec<DeveloperConfig>,
}

/// Organization entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    /// Organization name
    pub name: String,
    /// Organization URL
    pub url: Option<String>,
}

/// License entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// License name
    pub name: Option<String>,
    /// License text URL
    pub url: Option<String>,
}

/// SCM entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScmConfig {
    /// Connection string (scm:git:...)
    pub connection: Option<String>,
    /// Browse URL
    pub url: Option<String>,
}

/// Issue tracker entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuesConfig {
    /// Tracker system name
    pub system: String,
    /// Tracker URL
    pub url: String,
}

/// Developer entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperConfig {
    /// Developer id
    pub id: String,
    /// Display name
    pub name: Option<String>,
    /// Contact email
    pub email: Option<String>,
}

/// One publishable module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Maven artifact id
    pub artifact_id: String,
    /// Display name (defaults to artifact id)
    pub name: Option<String>,
    /// Module description
    pub description: Option<String>,
    /// Directory holding the built artifacts, relative to the manifest
    pub artifacts: Option<PathBuf>,
    /// Packaging / primary artifact extension
    pub packaging: Option<String>,
    /// Module version (overrides project version)
    pub version: Option<String>,
    /// Declared dependencies rendered into the descriptor
    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

impl ModuleConfig {
    /// Packaging with the `jar` default applied
    pub fn packaging(&self) -> &str {
        self.packaging.as_deref().unwrap_or("jar")
    }

    /// Absolute artifacts directory
    pub fn artifacts_dir(&self, root: &Path) -> PathBuf {
        match &self.artifacts {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join(&self.artifact_id).join("build").join("libs"),
        }
    }
}

/// Declared dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyConfig {
    /// Group id
    pub group: String,
    /// Artifact id
    pub artifact_id: String,
    /// Version
    pub version: String,
    /// Maven scope (compile, runtime, test)
    pub scope: Option<String>,
}

/// Remote repository target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target name
    pub name: String,
    /// Prefix for credential environment variables (defaults to the upper-cased name)
    pub env_prefix: Option<String>,
    /// Release endpoint (staging service URL for staged targets)
    pub release_url: Option<String>,
    /// Snapshot endpoint
    pub snapshot_url: Option<String>,
    /// Whether releases go through a staging repository
    #[serde(default = "default_true")]
    pub staged: bool,
    /// Staging profile id
    pub staging_profile_id: Option<String>,
    /// Refuse unsigned release publications
    #[serde(default = "default_true")]
    pub require_signatures: bool,
    /// Release the staging repository after closing it
    #[serde(default = "default_true")]
    pub release_after_close: bool,
}

impl TargetConfig {
    /// Sonatype OSSRH, as used by the legacy `oss.sonatype.org` host
    pub fn sonatype() -> Self {
        Self {
            name: "sonatype".to_string(),
            env_prefix: Some("OSSRH".to_string()),
            release_url: Some("https://oss.sonatype.org/service/local/".to_string()),
            snapshot_url: Some(
                "https://oss.sonatype.org/content/repositories/snapshots/".to_string(),
            ),
            staged: true,
            staging_profile_id: None,
            require_signatures: true,
            release_after_close: true,
        }
    }

    /// Sonatype OSSRH on the `s01` host used by newer accounts
    pub fn sonatype_s01() -> Self {
        Self {
            name: "sonatype-s01".to_string(),
            release_url: Some("https://s01.oss.sonatype.org/service/local/".to_string()),
            snapshot_url: Some(
                "https://s01.oss.sonatype.org/content/repositories/snapshots/".to_string(),
            ),
            ..Self::sonatype()
        }
    }

    /// Built-in target with the given name, if there is one
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "sonatype" => Some(Self::sonatype()),
            "sonatype-s01" => Some(Self::sonatype_s01()),
            _ => None,
        }
    }

    /// Environment variable prefix for this target's credentials
    pub fn env_prefix(&self) -> String {
        self.env_prefix
            .clone()
            .unwrap_or_else(|| self.name.to_uppercase().replace(['-', '.'], "_"))
    }
}

fn default_true() -> bool {
    true
}

/// Version resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersioningConfig {
    /// Suffix marking snapshot versions
    #[serde(default = "default_snapshot_marker")]
    pub snapshot_marker: String,
    /// Fall back to an exact git tag on HEAD
    #[serde(default)]
    pub git_tags: bool,
    /// Prefix stripped from git tags
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            snapshot_marker: default_snapshot_marker(),
            git_tags: false,
            tag_prefix: default_tag_prefix(),
        }
    }
}

fn default_snapshot_marker() -> String {
    "-SNAPSHOT".to_string()
}

fn default_tag_prefix() -> String {
    "v".to_string()
}

/// External build commands. `{module}` in any argument is replaced by the artifact id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Compile command (argv)
    pub compile: Option<Vec<String>>,
    /// Test command (argv)
    pub test: Option<Vec<String>>,
}

impl ProjectManifest {
    /// Load and structurally check a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ManifestError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path)?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&content, path, root)
    }

    /// Parse manifest content. `path` is used for error messages only.
    pub fn parse(content: &str, path: &Path, root: PathBuf) -> Result<Self> {
        let mut manifest: ProjectManifest =
            toml::from_str(content).map_err(|e| ManifestError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        manifest.root = root;

        if manifest.targets.is_empty() {
            manifest.targets.push(TargetConfig::sonatype());
        }

        manifest.check_structure(path)?;
        Ok(manifest)
    }

    fn check_structure(&self, path: &Path) -> Result<()> {
        if self.modules.is_empty() {
            return Err(ManifestError::NoModules {
                path: path.to_path_buf(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.artifact_id.as_str()) {
                return Err(ManifestError::Duplicate {
                    what: "module",
                    name: module.artifact_id.clone(),
                }
                .into());
            }
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(ManifestError::Duplicate {
                    what: "target",
                    name: target.name.clone(),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Look up a module by artifact id
    pub fn module(&self, artifact_id: &str) -> Result<&ModuleConfig> {
        self.modules
            .iter()
            .find(|m| m.artifact_id == artifact_id)
            .ok_or_else(|| {
                ReleaseError::from(ManifestError::ModuleNotFound {
                    name: artifact_id.to_string(),
                })
            })
    }

    /// Select modules by artifact id; an empty selection means all modules
    pub fn select_modules(&self, names: &[String]) -> Result<Vec<&ModuleConfig>> {
        if names.is_empty() {
            return Ok(self.modules.iter().collect());
        }
        names.iter().map(|n| self.module(n)).collect()
    }

    /// Select targets by name; an empty selection means all targets
    pub fn select_targets(&self, names: &[String]) -> Result<Vec<&TargetConfig>> {
        if names.is_empty() {
            return Ok(self.targets.iter().collect());
        }
        names
            .iter()
            .map(|n| {
                self.targets.iter().find(|t| &t.name == n).ok_or_else(|| {
                    ReleaseError::from(ManifestError::TargetNotFound { name: n.clone() })
                })
            })
            .collect()
    }
}
