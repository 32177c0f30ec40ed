//! Retry configuration for network operations.
//!
//! Provides configurable retry limits for the operations that talk to remote
//! repositories, allowing users to tune retry behavior based on network conditions.

use super::EnvConfig;
use std::time::Duration;

/// Configuration for retry behavior across different operation types
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Max retries for a single file upload
    pub file_uploads: u32,

    /// Max retries for staging repository open/close/release calls
    pub staging_operations: u32,

    /// Delay before the first retry; doubled on each subsequent attempt
    pub base_delay: Duration,

    /// Upper bound for a single backoff delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            file_uploads: 5,       // Higher - most network-dependent
            staging_operations: 3, // Conservative - server side state transitions
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Parse retry count from the environment snapshot with clamping to maximum
    fn parse_retry_env(env: &EnvConfig, var_name: &str, default: u32, max: u32) -> u32 {
        env.get_parsed::<u32>(var_name)
            .map(|v| v.min(max))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env(env: &EnvConfig) -> Self {
        let defaults = Self::default();
        Self {
            file_uploads: Self::parse_retry_env(env, "PUBLISH_RETRY_UPLOADS", 5, 20),
            staging_operations: Self::parse_retry_env(env, "PUBLISH_RETRY_STAGING", 3, 10),
            ..defaults
        }
    }

    /// Retry config that never sleeps, for tests and dry runs
    pub fn immediate(file_uploads: u32) -> Self {
        Self {
            file_uploads,
            staging_operations: file_uploads,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Backoff delay before retry number `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}
