//! Resolved repository targets.

use crate::config::{EnvConfig, TargetConfig};
use crate::error::{ManifestError, Result};
use crate::version::Channel;
use url::Url;

/// A repository target with endpoints resolved against the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    /// Target name
    pub name: String,
    /// Credential variable prefix
    pub env_prefix: String,
    /// Release endpoint (staging service base for staged targets)
    pub release_url: Url,
    /// Snapshot endpoint
    pub snapshot_url: Url,
    /// Staging profile id from configuration
    pub staging_profile_id: Option<String>,
    /// Whether releases go through a staging repository
    pub staged: bool,
    /// Refuse unsigned release publications
    pub require_signatures: bool,
    /// Release the staging repository after closing it
    pub release_after_close: bool,
}

impl RepositoryTarget {
    /// Resolve `config`, applying `{PREFIX}_RELEASE_URL` and `{PREFIX}_SNAPSHOT_URL`
    /// overrides. Only the Sonatype presets (`sonatype`, `sonatype-s01`) fall back to
    /// built-in URLs; any other target must configure both endpoints.
    pub fn from_config(config: &TargetConfig, env: &EnvConfig) -> Result<Self> {
        let env_prefix = config.env_prefix();
        let preset = TargetConfig::preset(&config.name);

        let pick = |which: &'static str,
                    configured: &Option<String>,
                    fallback: Option<String>|
         -> Result<String> {
            let variable = format!("{}_{}_URL", env_prefix, which.to_uppercase());
            env.get_non_blank(&variable)
                .map(str::to_string)
                .or_else(|| configured.clone().filter(|u| !u.trim().is_empty()))
                .or(fallback)
                .ok_or_else(|| {
                    ManifestError::MissingUrl {
                        target: config.name.clone(),
                        which,
                        variable,
                    }
                    .into()
                })
        };
        let release = pick(
            "release",
            &config.release_url,
            preset.as_ref().and_then(|p| p.release_url.clone()),
        )?;
        let snapshot = pick(
            "snapshot",
            &config.snapshot_url,
            preset.as_ref().and_then(|p| p.snapshot_url.clone()),
        )?;

        Ok(Self {
            name: config.name.clone(),
            release_url: parse_base_url(&config.name, &release)?,
            snapshot_url: parse_base_url(&config.name, &snapshot)?,
            staging_profile_id: config
                .staging_profile_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            staged: config.staged,
            require_signatures: config.require_signatures,
            release_after_close: config.release_after_close,
            env_prefix,
        })
    }

    /// Endpoint for a version channel
    pub fn endpoint_for(&self, channel: Channel) -> &Url {
        match channel {
            Channel::Release => &self.release_url,
            Channel::Snapshot => &self.snapshot_url,
        }
    }

    /// Whether publications on `channel` go through a staging repository
    pub fn uses_staging(&self, channel: Channel) -> bool {
        self.staged && channel == Channel::Release
    }
}

/// Parse an endpoint, normalized to end with `/` so relative joins stay below it
fn parse_base_url(target: &str, raw: &str) -> Result<Url> {
    let invalid = |reason: String| ManifestError::InvalidUrl {
        target: target.to_string(),
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())).into());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
