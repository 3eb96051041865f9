//! Retry loop for transient failures.
//!
//! The source site fails often and recovers on its own, so the default
//! policy retries forever. Each retry is logged at `warn` level and
//! counted, which is how a stuck crawl shows up to the operator.

use crate::CrawlerError;
use std::{cell::Cell, thread, time::Duration};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry; doubles on every further retry.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Total attempts before giving up. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        RetryPolicy {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts: None,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, Default)]
pub struct Retrier {
    policy: RetryPolicy,
    retries: Cell<u64>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Retrier {
            policy,
            retries: Cell::new(0),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries performed so far, across every call.
    pub fn retries(&self) -> u64 {
        self.retries.get()
    }

    /// Runs `op` until it succeeds or fails permanently.
    pub fn run<T, F>(&self, what: &str, mut op: F) -> Result<T, CrawlerError>
    where
        F: FnMut() -> Result<T, CrawlerError>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let err = match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => err,
                Err(err) => return Err(err),
            };

            if let Some(max) = self.policy.max_attempts {
                if attempt >= max {
                    return Err(CrawlerError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
            }

            self.retries.set(self.retries.get() + 1);
            let delay = self.policy.delay(attempt);
            warn!(attempt, ?delay, "{} failed, retrying: {}", what, err);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transient() -> CrawlerError {
        CrawlerError::Status {
            url: "https://nol.example/".to_string(),
            status: 500,
        }
    }

    #[test]
    fn test_retries_until_success() {
        let retrier = Retrier::new(RetryPolicy::immediate());
        let mut calls = 0;
        let value = retrier
            .run("fetch", || {
                calls += 1;
                if calls <= 3 {
                    Err(transient())
                } else {
                    Ok(calls)
                }
            })
            .unwrap();
        assert_eq!(value, 4);
        assert_eq!(retrier.retries(), 3);
    }

    #[test]
    fn test_permanent_error_is_not_retried() {
        let retrier = Retrier::new(RetryPolicy::immediate());
        let mut calls = 0;
        let err = retrier
            .run::<(), _>("fetch", || {
                calls += 1;
                Err(CrawlerError::InvalidSemester("x".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, CrawlerError::InvalidSemester(_)));
        assert_eq!(calls, 1);
        assert_eq!(retrier.retries(), 0);
    }

    #[test]
    fn test_attempt_cap() {
        let retrier = Retrier::new(RetryPolicy {
            max_attempts: Some(2),
            ..RetryPolicy::immediate()
        });
        let err = retrier.run::<(), _>("fetch", || Err(transient())).unwrap_err();
        assert!(matches!(err, CrawlerError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(retrier.retries(), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_attempts: None,
        };
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(5));
        assert_eq!(policy.delay(200), Duration::from_secs(5));
    }
}
