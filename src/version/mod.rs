//! Version resolution and release/snapshot classification.
//!
//! The resolved version decides which repository endpoint a module is published to:
//! versions ending with the snapshot marker go to the snapshot endpoint, everything
//! else to the release endpoint. Resolution itself is pure; the optional git tag is
//! looked up once by the caller (see [`git::head_tag`]) and handed in.

pub mod git;

use crate::config::{ModuleConfig, VersioningConfig};
use crate::error::{Result, VersionError};
use serde::{Deserialize, Serialize};

/// Release channel of a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Immutable release version
    Release,
    /// Mutable snapshot version
    Snapshot,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Release => write!(f, "release"),
            Channel::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Where a resolved version came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    /// `--version` or `PUBLISH_VERSION`
    Override,
    /// `version` on the `[[modules]]` entry
    Module,
    /// `version` under `[project]`
    Project,
    /// Exact git tag on HEAD
    GitTag,
}

/// A version ready for publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    /// Version string exactly as published
    pub raw: String,
    /// Parsed semantic version, when the string is one (`1.0` and `2.3.0.Final` are not)
    pub semver: Option<semver::Version>,
    /// Release or snapshot
    pub channel: Channel,
    /// Origin of the value
    pub source: VersionSource,
}

impl ResolvedVersion {
    /// Whether this version is published to the snapshot endpoint
    pub fn is_snapshot(&self) -> bool {
        self.channel == Channel::Snapshot
    }
}

impl std::fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Classify a version string by the snapshot marker suffix
pub fn classify(version: &str, snapshot_marker: &str) -> Channel {
    if !snapshot_marker.is_empty() && version.ends_with(snapshot_marker) {
        Channel::Snapshot
    } else {
        Channel::Release
    }
}

/// Reject versions that cannot be a single repository directory name
fn check_path_safe(version: &str) -> Result<()> {
    let reason = if version.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if version.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if version.contains("..") {
        Some("contains '..'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(VersionError::Invalid {
            version: version.to_string(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

/// Resolves the version of each module from the configured sources
#[derive(Debug, Clone)]
pub struct VersionResolver<'a> {
    versioning: &'a VersioningConfig,
    override_version: Option<&'a str>,
    project_version: Option<&'a str>,
    head_tag: Option<&'a str>,
}

impl<'a> VersionResolver<'a> {
    /// Create a resolver
    pub fn new(
        versioning: &'a VersioningConfig,
        override_version: Option<&'a str>,
        project_version: Option<&'a str>,
    ) -> Self {
        Self {
            versioning,
            override_version,
            project_version,
            head_tag: None,
        }
    }

    /// Supply the exact tag on HEAD, used when `git_tags` is enabled
    pub fn with_head_tag(mut self, tag: Option<&'a str>) -> Self {
        self.head_tag = tag;
        self
    }

    /// Resolve the version for `module`
    pub fn resolve(&self, module: &ModuleConfig) -> Result<ResolvedVersion> {
        let (raw, source) = self
            .candidates(module)
            .into_iter()
            .find_map(|(value, source)| {
                value
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| (v.to_string(), source))
            })
            .ok_or_else(|| VersionError::Unresolved {
                module: module.artifact_id.clone(),
            })?;

        check_path_safe(&raw)?;
        let semver = semver::Version::parse(&raw).ok();
        let channel = classify(&raw, &self.versioning.snapshot_marker);

        log::debug!(
            "Resolved version {} ({}) for {} from {:?}",
            raw,
            channel,
            module.artifact_id,
            source
        );

        Ok(ResolvedVersion {
            raw,
            semver,
            channel,
            source,
        })
    }

    fn candidates<'m>(&'m self, module: &'m ModuleConfig) -> [(Option<&'m str>, VersionSource); 4] {
        let tag = if self.versioning.git_tags {
            self.head_tag.map(|t| {
                t.strip_prefix(self.versioning.tag_prefix.as_str())
                    .unwrap_or(t)
            })
        } else {
            None
        };

        [
            (self.override_version, VersionSource::Override),
            (module.version.as_deref(), VersionSource::Module),
            (self.project_version, VersionSource::Project),
            (tag, VersionSource::GitTag),
        ]
    }
}
