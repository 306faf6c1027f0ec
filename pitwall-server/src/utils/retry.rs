//! Retry with a fixed backoff schedule
//!
//! Used for calls to dependencies that may be cold-starting: a retryable failure waits the
//! next delay in the schedule and tries again; a non-retryable failure, or a retryable one
//! after the schedule is exhausted, is returned to the caller.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delays before the 2nd, 3rd and 4th attempt against the lineup service
pub const LINEUP_SERVICE_BACKOFF: [Duration; 3] = [
    Duration::from_secs(15),
    Duration::from_secs(30),
    Duration::from_secs(60),
];

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Run `operation` up to `delays.len() + 1` times
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "lineup sync 2026")
/// * `delays` - Wait before each retry, in order
/// * `operation` - Async closure performing one attempt
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    delays: &[Duration],
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = delays.len() + 1;
    let mut attempt = 0usize;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Non-retryable failure"
                );
                return Err(err);
            }
            Err(err) => {
                let Some(delay) = delays.get(attempt - 1).copied() else {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "Giving up after final attempt"
                    );
                    return Err(err);
                };

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    backoff_secs = delay.as_secs(),
                    error = %err,
                    "Retryable failure, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
