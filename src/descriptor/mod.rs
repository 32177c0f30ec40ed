//! Module descriptor assembly from static project metadata.
//!
//! A [`ModuleDescriptor`] is built once per publish run from the `[project]` section and
//! one `[[modules]]` entry of Publish.toml. Building is pure: every required field is
//! checked here so a misconfigured project stops before any remote call is made.

mod pom;

pub use pom::render_pom;

use crate::config::{ModuleConfig, ProjectConfig};
use crate::error::{DescriptorError, Result};
use serde::Serialize;

/// Owning organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    /// Organization name
    pub name: String,
    /// Organization URL
    pub url: Option<String>,
}

/// License reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    /// License name
    pub name: String,
    /// License text URL
    pub url: String,
}

/// Source control coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scm {
    /// Connection string (scm:git:...)
    pub connection: String,
    /// Browse URL
    pub url: String,
}

/// Issue tracker reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueTracker {
    /// Tracker system name
    pub system: String,
    /// Tracker URL
    pub url: String,
}

/// Developer contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Developer {
    /// Developer id
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: Option<String>,
}

/// Declared dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Group id
    pub group: String,
    /// Artifact id
    pub artifact_id: String,
    /// Version
    pub version: String,
    /// Maven scope
    pub scope: String,
}

/// Publishable metadata for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    /// Maven group id
    pub group: String,
    /// Maven artifact id
    pub artifact_id: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Project home page
    pub url: String,
    /// Packaging of the primary artifact
    pub packaging: String,
    /// Owning organization
    pub organization: Option<Organization>,
    /// License
    pub license: License,
    /// Source control coordinates
    pub scm: Scm,
    /// Issue tracker
    pub issues: Option<IssueTracker>,
    /// Developers
    pub developers: Vec<Developer>,
    /// Declared dependencies
    pub dependencies: Vec<Dependency>,
}

impl ModuleDescriptor {
    /// Build the descriptor for `module`, validating required metadata
    pub fn build(project: &ProjectConfig, module: &ModuleConfig) -> Result<Self> {
        let artifact_id = module.artifact_id.trim();
        if artifact_id.is_empty() {
            return Err(missing("<unnamed>", "modules.artifact_id"));
        }

        let required = |value: Option<&String>, field: &'static str| -> Result<String> {
            value
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| missing(artifact_id, field))
        };

        let group = required(project.group.as_ref(), "project.group")?;
        let url = required(project.url.as_ref(), "project.url")?;

        let license = project
            .license
            .as_ref()
            .ok_or_else(|| missing(artifact_id, "project.license"))?;
        let license = License {
            name: required(license.name.as_ref(), "project.license.name")?,
            url: required(license.url.as_ref(), "project.license.url")?,
        };

        let scm = project
            .scm
            .as_ref()
            .ok_or_else(|| missing(artifact_id, "project.scm"))?;
        let scm = Scm {
            connection: required(scm.connection.as_ref(), "project.scm.connection")?,
            url: required(scm.url.as_ref(), "project.scm.url")?,
        };

        if project.developers.is_empty() {
            return Err(missing(artifact_id, "project.developers"));
        }
        let developers = project
            .developers
            .iter()
            .map(|d| Developer {
                id: d.id.clone(),
                name: d.name.clone().unwrap_or_else(|| d.id.clone()),
                email: d.email.clone(),
            })
            .collect();

        let issues = match &project.issues {
            Some(issues) => Some(IssueTracker {
                system: issues.system.clone(),
                url: issues.url.clone(),
            }),
            None if url.contains("github.com/") => Some(IssueTracker {
                system: "GitHub".to_string(),
                url: format!("{}/issues", url.trim_end_matches('/')),
            }),
            None => None,
        };

        let description = module
            .description
            .clone()
            .or_else(|| project.description.clone())
            .filter(|d| !d.trim().is_empty());

        Ok(Self {
            group,
            artifact_id: artifact_id.to_string(),
            name: module
                .name
                .clone()
                .unwrap_or_else(|| artifact_id.to_string()),
            description,
            url,
            packaging: module.packaging().to_string(),
            organization: project.organization.as_ref().map(|o| Organization {
                name: o.name.clone(),
                url: o.url.clone(),
            }),
            license,
            scm,
            issues,
            developers,
            dependencies: module
                .dependencies
                .iter()
                .map(|d| Dependency {
                    group: d.group.clone(),
                    artifact_id: d.artifact_id.clone(),
                    version: d.version.clone(),
                    scope: d.scope.clone().unwrap_or_else(|| "compile".to_string()),
                })
                .collect(),
        })
    }

    /// Published coordinate `group:artifact:version`
    pub fn coordinate(&self, version: &str) -> String {
        format!("{}:{}:{}", self.group, self.artifact_id, version)
    }

    /// Repository directory for this module version, e.g. `com/example/core/1.0.0`
    pub fn repository_path(&self, version: &str) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact_id,
            version
        )
    }

    /// Base file name shared by every artifact of this version
    pub fn file_stem(&self, version: &str) -> String {
        format!("{}-{}", self.artifact_id, version)
    }
}

fn missing(module: &str, field: &'static str) -> crate::error::ReleaseError {
    DescriptorError::MissingField {
        module: module.to_string(),
        field,
    }
    .into()
}
