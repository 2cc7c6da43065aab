//! Bounded immediate retry for operations racing a transient conflict.

use std::fmt;
use std::future::Future;

/// Reattempts an operation up to a fixed count, immediately, before giving
/// up with the last error.
///
/// Used for the listener bind, where the conflict (a previous process
/// instance still holding the port during a restart race) resolves within
/// moments or not at all; a delay would only slow startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRetry {
    max_attempts: u32,
}

impl BoundedRetry {
    /// Creates a retrier with the given total attempt budget. The
    /// operation always runs at least once.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// The total attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `op` until it succeeds or the budget is exhausted, passing the
    /// 1-based attempt number through for logging. Returns the last error
    /// once attempts run out.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => return Err(err),
                Err(err) => {
                    tracing::debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "attempt failed; retrying immediately"
                    );
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting_op(
        counter: &Arc<AtomicU32>,
        succeed_on: u32,
    ) -> impl FnMut(u32) -> std::future::Ready<Result<u32, String>> + '_ {
        move |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if attempt >= succeed_on {
                Ok(attempt)
            } else {
                Err(format!("attempt {attempt} failed"))
            })
        }
    }

    #[tokio::test]
    async fn first_attempt_success_skips_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = BoundedRetry::new(4).run(counting_op(&calls, 1)).await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_the_budget_then_returns_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = BoundedRetry::new(4).run(counting_op(&calls, 10)).await;

        assert_eq!(result, Err("attempt 4 failed".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn succeeds_mid_window_without_spending_the_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = BoundedRetry::new(4).run(counting_op(&calls, 3)).await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_budget_still_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = BoundedRetry::new(0).run(counting_op(&calls, 10)).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
