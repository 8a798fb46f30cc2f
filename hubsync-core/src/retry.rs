//! Bounded retry with exponential backoff.

use crate::error::{SyncError, SyncResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times a fallible call is attempted and how long to wait between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff unit, doubled per failed attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(5000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Wait after the `failed_attempts`-th consecutive failure (1-indexed).
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        // cap the exponent so the multiplication cannot overflow
        self.base_delay
            .saturating_mul(1u32 << failed_attempts.min(16))
    }

    /// Runs `attempt` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    ///
    /// The closure receives the 1-based attempt number, which lets call
    /// sites do per-retry housekeeping such as credential refresh.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> SyncResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut tries = 0;

        loop {
            tries += 1;

            let err = match attempt(tries).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            warn!(operation, attempt = tries, error = %err, "attempt failed");

            if tries >= self.max_attempts {
                return Err(SyncError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: tries,
                    last_error: err.to_string(),
                });
            }

            tokio::time::sleep(self.delay_after(tries)).await;
        }
    }
}
