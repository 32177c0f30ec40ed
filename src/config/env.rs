//! Snapshot of environment variables.
//!
//! The process environment is read exactly once at the entry point. Every stage receives
//! this snapshot instead of calling `std::env`, so pipelines can be exercised in tests
//! without mutating the process environment.

use crate::error::{CliError, ReleaseError, Result};
use std::collections::HashMap;
use std::path::Path;
use zeroize::{Zeroize, Zeroizing};

/// Snapshot of environment variables threaded through the publish pipeline
#[derive(Clone, Default)]
pub struct EnvConfig {
    vars: HashMap<String, String>,
}

impl EnvConfig {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Merge variables from a dotenv file.
    ///
    /// Variables already present in the snapshot win, matching the usual dotenv semantics
    /// where the real environment overrides the file.
    pub fn with_dotenv(mut self, path: &Path) -> Result<Self> {
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            ReleaseError::Cli(CliError::InvalidArguments {
                reason: format!("Failed to read env file {}: {}", path.display(), e),
            })
        })?;

        for item in iter {
            let (key, value) = item.map_err(|e| {
                ReleaseError::Cli(CliError::InvalidArguments {
                    reason: format!("Invalid line in env file {}: {}", path.display(), e),
                })
            })?;
            self.vars.entry(key).or_insert(value);
        }

        Ok(self)
    }

    /// Get a variable value (owned)
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Remove a variable from the snapshot, handing its value over for wiping on drop
    pub fn take_secret(&mut self, key: &str) -> Option<Zeroizing<String>> {
        self.vars.remove(key).map(Zeroizing::new)
    }

    /// Get a variable only if it is present and not blank
    pub fn get_non_blank(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Parse a numeric variable, ignoring blank or invalid values
    pub fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get_non_blank(key).and_then(|v| v.trim().parse().ok())
    }
}

// Values are secrets more often than not.
impl Drop for EnvConfig {
    fn drop(&mut self) {
        for value in self.vars.values_mut() {
            value.zeroize();
        }
    }
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("EnvConfig").field("keys", &keys).finish()
    }
}
