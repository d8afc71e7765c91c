//! Bounded optimistic retry.

use std::future::Future;
use std::time::Duration;

use crate::{FulfillmentError, Result};

/// How many times to re-run an operation that lost a concurrency race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    /// Runs `attempt_fn` until it succeeds, fails with a non-retryable error,
    /// or the attempt budget is spent.
    ///
    /// Each attempt must start from a fresh read. The closure receives the
    /// 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match attempt_fn(attempt).await {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(operation, attempts = attempt, "giving up after repeated conflicts");
                        return Err(FulfillmentError::Conflict { attempts: attempt });
                    }

                    tracing::debug!(operation, attempt, error = %err, "lost concurrency race, retrying");
                    let delay = self.delay_after(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(5))
    }
}
