//! Retry logic with exponential backoff for repository calls.

use crate::config::RetryConfig;
use crate::error::Result;

/// Retry an async operation with exponential backoff
///
/// Only recoverable errors (transport failures and timeouts) are retried; authentication
/// and configuration errors return immediately.
///
/// # Arguments
/// * `operation` - Async closure that returns Result<T>
/// * `max_retries` - Maximum number of retry attempts (0 = try once, no retries)
/// * `operation_name` - Human-readable name for logging
/// * `config` - Backoff settings
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    max_retries: u32,
    operation_name: &str,
    config: &RetryConfig,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempts > 0 {
                    log::info!("{} succeeded after {} retry(ies)", operation_name, attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_recoverable() {
                    log::debug!("{} failed with unrecoverable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempts >= max_retries {
                    log::warn!(
                        "{} failed after {} attempt(s): {}",
                        operation_name,
                        attempts + 1,
                        e
                    );
                    return Err(e);
                }

                attempts += 1;
                let wait = config.backoff_delay(attempts);

                log::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:.1}s",
                    operation_name,
                    attempts,
                    max_retries + 1,
                    e,
                    wait.as_secs_f64()
                );

                tokio::time::sleep(wait).await;
            }
        }
    }
}
