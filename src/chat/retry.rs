//! Bounded retry with a fixed interval.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// How many times to try an operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as at least 1.
    pub max_attempts: usize,
    /// Pause after each failed attempt except the last.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success { value: T, attempts: usize },
    Exhausted { attempts: usize, last_error: E },
}

impl<T, E> RetryOutcome<T, E> {
    /// Number of attempts that were made.
    #[allow(dead_code)]
    pub fn attempts(&self) -> usize {
        match self {
            RetryOutcome::Success { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The value, if any attempt succeeded.
    #[allow(dead_code)]
    pub fn ok(self) -> Option<T> {
        match self {
            RetryOutcome::Success { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Run `op` until it succeeds or the attempts run out.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> RetryOutcome<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome::Success {
                        value,
                        attempts: attempt,
                    }
                }
                Err(e) if attempt >= max_attempts => {
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    }
                }
                Err(e) => {
                    debug!("Attempt {}/{} failed: {}", attempt, max_attempts, e);
                    tokio::time::sleep(self.interval).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_first_attempt_succeeds() {
        let calls = Cell::new(0);
        let outcome = tokio_test::block_on(fast(3).run(|_| {
            calls.set(calls.get() + 1);
            async { Ok::<_, String>("answer") }
        }));

        assert_eq!(calls.get(), 1);
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(outcome.ok(), Some("answer"));
    }

    #[test]
    fn test_succeeds_after_failures() {
        let outcome = tokio_test::block_on(fast(5).run(|attempt| async move {
            if attempt < 3 {
                Err(format!("not ready on attempt {}", attempt))
            } else {
                Ok(attempt * 10)
            }
        }));

        match outcome {
            RetryOutcome::Success { value, attempts } => {
                assert_eq!(value, 30);
                assert_eq!(attempts, 3);
            }
            RetryOutcome::Exhausted { .. } => panic!("expected success"),
        }
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let calls = Cell::new(0);
        let outcome = tokio_test::block_on(fast(4).run(|attempt| {
            calls.set(calls.get() + 1);
            async move { Err::<(), _>(format!("failure {}", attempt)) }
        }));

        assert_eq!(calls.get(), 4);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(last_error, "failure 4");
            }
            RetryOutcome::Success { .. } => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let outcome = tokio_test::block_on(fast(0).run(|_| async { Err::<(), _>("down") }));
        assert_eq!(outcome.attempts(), 1);
        assert!(outcome.ok().is_none());
    }
}
