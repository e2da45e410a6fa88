//! Bounded retry with jittered fixed delays.

use lumiere_error::RetryableError;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry2::strategy::{FixedInterval, jitter};
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// How often and how patiently to retry a service call.
///
/// Every retry re-issues the same request after a jittered delay. Malformed
/// output and transport failures share the same attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay_ms: u64,
}

/// Why a retried operation gave up.
#[derive(Debug, Clone)]
pub struct RetryFailure<E> {
    /// Attempts made, including the first
    pub attempts: u32,
    /// Error from the final attempt
    pub error: E,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` calls in total.
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_ms,
        }
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delays between attempts.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        FixedInterval::from_millis(self.delay_ms)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// # Errors
    ///
    /// Returns the last error together with the number of attempts made.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, RetryFailure<E>>
    where
        E: RetryableError + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = Arc::new(AtomicU32::new(0));
        let max = self.max_attempts;

        let result = Retry::spawn(self.strategy(), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = operation(attempt);
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_retryable() => {
                        warn!(label, attempt, max, error = %e, "Attempt failed, will retry");
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => {
                        warn!(label, attempt, error = %e, "Permanent failure, not retrying");
                        Err(RetryError::Permanent(e))
                    }
                }
            }
        })
        .await;

        let made = attempts.load(Ordering::SeqCst);
        match result {
            Ok(value) => {
                debug!(label, attempts = made, "Operation succeeded");
                Ok(value)
            }
            Err(error) => Err(RetryFailure {
                attempts: made,
                error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumiere_error::{GenerationError, GenerationErrorKind};

    #[test]
    fn test_strategy_length() {
        assert_eq!(RetryPolicy::new(4, 10).strategy().count(), 3);
        assert_eq!(RetryPolicy::new(1, 10).strategy().count(), 0);
        assert_eq!(RetryPolicy::new(0, 10).max_attempts(), 1);
    }

    #[test]
    fn test_jitter_stays_within_half_to_one_and_a_half_base() {
        let delays: Vec<Duration> = RetryPolicy::new(20, 50).strategy().collect();
        assert_eq!(delays.len(), 19);
        assert!(delays
            .iter()
            .all(|d| *d >= Duration::from_millis(25) && *d <= Duration::from_millis(75)));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let policy = RetryPolicy::new(5, 1);
        let result = policy
            .run("test", |attempt| async move {
                if attempt < 3 {
                    Err(GenerationError::new(GenerationErrorKind::Malformed("bad".into())))
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts() {
        let policy = RetryPolicy::new(3, 1);
        let failure = policy
            .run("test", |_| async {
                Err::<(), _>(GenerationError::new(GenerationErrorKind::Timeout(5)))
            })
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert!(matches!(failure.error.kind, GenerationErrorKind::Timeout(5)));
    }

    #[tokio::test]
    async fn test_permanent_stops_immediately() {
        let policy = RetryPolicy::new(10, 1);
        let failure = policy
            .run("test", |_| async {
                Err::<(), _>(GenerationError::new(GenerationErrorKind::MissingApiKey(
                    "KEY".into(),
                )))
            })
            .await
            .unwrap_err();
        assert_eq!(failure.attempts, 1);
    }
}
