//! Retry Policy - Bounded Retries with Exponential Backoff
//!
//! An explicit policy object instead of ad-hoc sleep-and-retry loops:
//! max attempts, a backoff function, and a classifier. The classifier is
//! `SourceError::is_transient`, so retryability is decided by structured
//! error kinds at the adapter boundary, never by matching vendor error
//! message text.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::SourceError;

/// Bounded exponential-backoff retry policy for source requests.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, first try included.
    max_attempts: u32,
    /// Base delay, doubled on each subsequent retry.
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based).
    fn backoff(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry - 1)
    }

    /// Run `op` until it succeeds, fails fatally, or the attempt budget
    /// is exhausted. Only transient errors are retried.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = self.backoff(attempt - 1);
                debug!(
                    label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    warn!(label, attempt, error = %err, "Transient source error");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            SourceError::Network(format!("{label}: retry budget exhausted"))
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts,
            base_delay_ms: 1,
        })
    }

    #[tokio::test]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = policy(4)
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SourceError::Network("flaky".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_short_circuit() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = policy(4)
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Malformed("bad payload".into()))
            })
            .await;
        assert!(matches!(result, Err(SourceError::Malformed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_returns_last_transient_error() {
        let result: Result<(), _> = policy(3)
            .run("test", || async {
                Err(SourceError::RateLimited("429".into()))
            })
            .await;
        assert!(matches!(result, Err(SourceError::RateLimited(_))));
    }
}
