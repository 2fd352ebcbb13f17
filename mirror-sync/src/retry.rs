//! Exponential-backoff retry policy for single filesystem operations.
//!
//! The delay after failed attempt `n` (numbered from 1) is
//! `base_delay * 2^n`, so the default policy (3 attempts, 100 ms) sleeps
//! 200 ms and then 400 ms before giving up. Sleeping blocks the calling
//! thread.

use std::io;
use std::thread;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Sleep taken after failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds or `max_attempts` is reached.
    ///
    /// `op` receives the 1-based attempt number. On exhaustion every
    /// attempt's error is returned, oldest first. A policy with
    /// `max_attempts == 0` still makes one attempt.
    pub fn retry<T, F>(&self, mut op: F) -> Result<T, Vec<io::Error>>
    where
        F: FnMut(u32) -> io::Result<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut errors = Vec::new();
        for attempt in 1..=max_attempts {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "attempt {attempt}/{max_attempts} failed: {err}; retrying in {delay:?}"
                    );
                    errors.push(err);
                    thread::sleep(delay);
                }
                Err(err) => errors.push(err),
            }
        }
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};
    use std::time::Instant;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn default_policy_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[test]
    fn huge_attempt_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(64), policy.delay_for(40));
    }

    #[test]
    fn first_success_makes_one_call() {
        let mut calls = 0;
        let result = fast(3).retry(|_| {
            calls += 1;
            Ok::<_, Error>("done")
        });
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 1);
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let result = fast(3).retry(|attempt| {
            if attempt < 3 {
                Err(Error::new(ErrorKind::PermissionDenied, "locked"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn exhaustion_returns_every_error_in_order() {
        let errors = fast(3)
            .retry(|attempt| -> io::Result<()> {
                Err(Error::new(ErrorKind::Other, format!("failure {attempt}")))
            })
            .unwrap_err();
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, vec!["failure 1", "failure 2", "failure 3"]);
    }

    #[test]
    fn zero_attempt_policy_still_tries_once() {
        let mut calls = 0;
        let errors = fast(0)
            .retry(|_| -> io::Result<()> {
                calls += 1;
                Err(Error::new(ErrorKind::Other, "nope"))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn sleeps_between_attempts_but_not_after_last() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let start = Instant::now();
        let _ = policy.retry(|_| -> io::Result<()> { Err(Error::new(ErrorKind::Other, "x")) });
        let elapsed = start.elapsed();
        // 20ms + 40ms; no 80ms sleep after the final attempt.
        assert!(elapsed >= Duration::from_millis(60), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
    }
}
