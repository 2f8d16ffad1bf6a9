//! Exponential backoff for record-source operations.
//!
//! Connection drops and statement timeouts against a hosted database are
//! usually transient, so fetches go through [`with_backoff`] instead of
//! failing the request on the first error. Data errors (malformed rows,
//! bad `GeoJSON`) are permanent and returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::SourceError;

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based): 1s, 2s, 4s, ...
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Runs `op`, retrying transient failures according to `policy`.
///
/// `op` is called once per attempt so each retry starts from a fresh
/// future.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && is_transient(&e) => {
                attempt += 1;
                let delay = policy.delay(attempt);
                log::warn!(
                    "{label} failed: {e}; retry {attempt}/{} in {delay:?}...",
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 0 {
                    log::error!("{label} failed after {attempt} retries: {e}");
                }
                return Err(e);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
const fn is_transient(e: &SourceError) -> bool {
    matches!(
        e,
        SourceError::Database(_) | SourceError::Connection { .. } | SourceError::Io(_)
    )
}
