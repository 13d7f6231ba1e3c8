//! Bounded retry with exponential backoff
//!
//! Every external call (market data, generation) goes through a
//! [`RetryPolicy`]. Failed attempts are logged with a truncated error text;
//! throttling only changes the log line, never the schedule.

use crate::error::{Result, ReviewError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// Maximum number of characters of an error kept in attempt logs
const LOG_ERROR_CHARS: usize = 100;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Policy for generation calls: 5 attempts, 5 s base, 60 s cap
    pub fn generation() -> Self {
        Self::new(5, Duration::from_secs(5), Duration::from_secs(60))
    }

    /// Policy for market data calls: 2 attempts, 2 s base, 5 s cap
    pub fn data_fetch() -> Self {
        Self::new(2, Duration::from_secs(2), Duration::from_secs(5))
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Retry without sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Check the policy parameters
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ReviewError::Config(format!(
                "{name}: max_attempts must be at least 1"
            )));
        }
        if self.max_delay.is_zero() && !self.base_delay.is_zero() {
            return Err(ReviewError::Config(format!(
                "{name}: max_delay must be greater than 0"
            )));
        }
        Ok(())
    }

    /// Delay to wait before the given attempt (1-based)
    ///
    /// Zero before the first attempt, then `base * 2^(attempt-2)` capped at
    /// `max_delay`.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(31);
        self.base_delay
            .checked_mul(1_u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Execute an async operation with retry logic
    ///
    /// Returns the first success, or the last error once all attempts are
    /// spent.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let backoff = self.backoff_before(attempt);
            if !backoff.is_zero() {
                debug!(
                    "Retrying '{}' (attempt {}/{}) in {:?}",
                    operation_name, attempt, max_attempts, backoff
                );
                sleep(backoff).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(
                            "Operation '{}' succeeded after {} retries",
                            operation_name,
                            attempt - 1
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    log_attempt_failure(operation_name, attempt, max_attempts, &e);
                    if attempt >= max_attempts {
                        error!(
                            "Operation '{}' failed after {} attempts: {}",
                            operation_name,
                            max_attempts,
                            truncate_error(&e)
                        );
                        return Err(e);
                    }
                }
            }

            attempt += 1;
        }
    }
}

/// Log one failed attempt, distinguishing throttling from other failures
pub(crate) fn log_attempt_failure(
    operation_name: &str,
    attempt: u32,
    max_attempts: u32,
    err: &ReviewError,
) {
    let text = truncate_error(err);
    if err.is_rate_limited() {
        warn!(
            operation = operation_name,
            attempt,
            max_attempts,
            "Rate limited (attempt {}/{}): {}",
            attempt,
            max_attempts,
            text
        );
    } else {
        warn!(
            operation = operation_name,
            attempt,
            max_attempts,
            "Call failed (attempt {}/{}): {}",
            attempt,
            max_attempts,
            text
        );
    }
}

/// First 100 characters of an error's display text
pub(crate) fn truncate_error(err: &ReviewError) -> String {
    err.to_string().chars().take(LOG_ERROR_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::generation();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(5));
        assert_eq!(policy.max_delay, Duration::from_secs(60));

        let policy = RetryPolicy::data_fetch();
        assert_eq!(policy.max_attempts, 2);
    }

    #[test]
    fn test_backoff_growth() {
        let policy = RetryPolicy::new(10, Duration::from_secs(5), Duration::from_secs(60));

        assert_eq!(policy.backoff_before(1), Duration::ZERO);
        assert_eq!(policy.backoff_before(2), Duration::from_secs(5));
        assert_eq!(policy.backoff_before(3), Duration::from_secs(10));
        assert_eq!(policy.backoff_before(4), Duration::from_secs(20));
        assert_eq!(policy.backoff_before(5), Duration::from_secs(40));
        assert_eq!(policy.backoff_before(6), Duration::from_secs(60));
        assert_eq!(policy.backoff_before(40), Duration::from_secs(60));
    }

    #[test]
    fn test_backoff_data_policy() {
        let policy = RetryPolicy::data_fetch();
        assert_eq!(policy.backoff_before(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_before(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_before(4), Duration::from_secs(5));
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::generation().validate("llm").is_ok());
        assert!(RetryPolicy::immediate(3).validate("test").is_ok());
        assert!(RetryPolicy::immediate(0).validate("test").is_err());

        let zero_cap = RetryPolicy::new(3, Duration::from_secs(1), Duration::ZERO);
        assert!(zero_cap.validate("test").is_err());
    }

    #[test]
    fn test_truncate_error() {
        let err = ReviewError::DataProvider("x".repeat(500));
        assert_eq!(truncate_error(&err).chars().count(), 100);

        let err = ReviewError::Parse("数据".repeat(100));
        assert_eq!(truncate_error(&err).chars().count(), 100);
    }

    #[tokio::test]
    async fn test_execute_success_first_try() {
        let policy = RetryPolicy::immediate(3);
        let attempt_count = Arc::new(Mutex::new(0));
        let count = attempt_count.clone();

        let result = policy
            .execute("test_op", || {
                let count = count.clone();
                async move {
                    *count.lock().await += 1;
                    Ok::<i32, ReviewError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(*attempt_count.lock().await, 1);
    }

    #[tokio::test]
    async fn test_execute_success_after_retry() {
        let policy = RetryPolicy::immediate(3);
        let attempt_count = Arc::new(Mutex::new(0));
        let count = attempt_count.clone();

        let result = policy
            .execute("test_op", || {
                let count = count.clone();
                async move {
                    let mut current = count.lock().await;
                    *current += 1;
                    if *current < 2 {
                        Err(ReviewError::DataProvider("HTTP 429".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(*attempt_count.lock().await, 2);
    }

    #[tokio::test]
    async fn test_always_failing_runs_exactly_max_attempts() {
        for max_attempts in [1, 2, 5] {
            let policy = RetryPolicy::immediate(max_attempts);
            let attempt_count = Arc::new(Mutex::new(0_u32));
            let count = attempt_count.clone();

            let result = policy
                .execute("always_fails", || {
                    let count = count.clone();
                    async move {
                        *count.lock().await += 1;
                        Err::<(), _>(ReviewError::DataProvider("boom".to_string()))
                    }
                })
                .await;

            assert!(matches!(result, Err(ReviewError::DataProvider(_))));
            assert_eq!(*attempt_count.lock().await, max_attempts);
        }
    }

    #[tokio::test]
    async fn test_last_error_is_returned() {
        let policy = RetryPolicy::immediate(3);
        let attempt_count = Arc::new(Mutex::new(0_u32));
        let count = attempt_count.clone();

        let result = policy
            .execute("numbered", || {
                let count = count.clone();
                async move {
                    let mut current = count.lock().await;
                    *current += 1;
                    Err::<(), _>(ReviewError::DataProvider(format!("failure {}", *current)))
                }
            })
            .await;

        match result {
            Err(ReviewError::DataProvider(msg)) => assert_eq!(msg, "failure 3"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
