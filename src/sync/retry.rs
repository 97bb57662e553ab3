use crate::error::{Result, SyncError};
use crate::utils::constants::{DEFAULT_FETCH_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed attempt count with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation` until it succeeds, fails with a non-transient error,
    /// or runs out of attempts. Exhaustion becomes `FetchFailed` for `path`.
    pub async fn run<T, F, Fut>(&self, path: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.attempts => {
                    warn!(path, attempt, error = %err, "Fetch failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(SyncError::TransientFetch { message, .. }) => {
                    return Err(SyncError::FetchFailed {
                        path: path.to_string(),
                        attempts: attempt,
                        message,
                    })
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_FETCH_ATTEMPTS,
            Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> SyncError {
        SyncError::TransientFetch {
            path: "2010/x.op.gz".to_string(),
            message: "connection reset".to_string(),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result = policy
            .run("2010/x.op.gz", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_is_fetch_failed() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(4, Duration::ZERO);

        let result: Result<()> = policy
            .run("2010/x.op.gz", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        match result {
            Err(SyncError::FetchFailed { attempts, path, .. }) => {
                assert_eq!(attempts, 4);
                assert_eq!(path, "2010/x.op.gz");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(5, Duration::ZERO);

        let result: Result<()> = policy
            .run("isd-inventory.csv", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::store("isd-inventory.csv", "disk full"))
            })
            .await;

        assert!(matches!(result, Err(SyncError::StoreUnavailable { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }
}
