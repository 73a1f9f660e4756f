//! Retry policy for upstream calls
//!
//! A [`RetryPolicy`] is plain data; [`retry_with_policy`] drives any async
//! operation with it. Only errors that report themselves retryable
//! ([`IngestError::is_retryable`]) are tried again.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{IngestError, Result};

/// Attempt budget with a fixed delay between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub backoff_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_delay,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are spent. The last error is returned on exhaustion.
pub async fn retry_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Attempt failed, retrying"
                );
                if !policy.backoff_delay.is_zero() {
                    tokio::time::sleep(policy.backoff_delay).await;
                }
                attempt += 1;
            },
            Err(e) => {
                if e.is_retryable() {
                    return Err(IngestError::TransientNetwork(format!(
                        "{} failed after {} attempts: {}",
                        label, attempt, e
                    )));
                }
                return Err(e);
            },
        }
    }
}
