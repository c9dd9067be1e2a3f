//! Retry policies and protocol timings
//!
//! Each network phase applies an explicit [`RetryPolicy`] at its call site.
//! The policy decides how many attempts are made and how long to wait before
//! each; the operation itself decides what counts as "try again".

use crate::config::BackupConfig;
use crate::domain::Result;
use std::future::Future;
use std::time::Duration;

/// How the wait before an attempt grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// `base * 2^(n-1)` before attempt `n`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// Attempt budget plus delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_attempts: u32, base: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base, max },
        }
    }

    /// Wait before the given 1-based attempt
    ///
    /// The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }

    /// Run `op` until it yields a value, fails with a non-retryable error,
    /// or the attempt budget is spent
    ///
    /// `op` receives the 1-based attempt number. `Ok(None)` means "not yet"
    /// and is retried like a transient error. Once attempts run out the last
    /// outcome is returned: `Ok(None)` or the last error.
    ///
    /// # Errors
    ///
    /// Returns the first error for which `is_retryable()` is false, or the
    /// last retryable error when the budget is exhausted.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<Option<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tracing::info!(
                    operation,
                    attempt,
                    max_attempts = self.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Waiting before next attempt"
                );
                tokio::time::sleep(delay).await;
            }

            match op(attempt).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {
                    last_error = None;
                    tracing::debug!(operation, attempt, "Attempt produced no result yet");
                }
                Err(e) if e.is_retryable() => {
                    crate::log_retry_attempt!(attempt, self.max_attempts, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// Every timing knob of the export protocol
///
/// Production values come from configuration; tests construct this directly
/// with millisecond durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolTimings {
    /// Per-request timeout for API calls
    pub request_timeout: Duration,
    /// Enqueue attempts with a fixed delay
    pub enqueue: RetryPolicy,
    pub poll_interval: Duration,
    /// Total waiting budget for the poller
    pub poll_timeout: Duration,
    /// Feed fetch + match attempts with exponential backoff
    pub matching: RetryPolicy,
    pub download_timeout: Duration,
}

impl ProtocolTimings {
    pub fn from_config(config: &BackupConfig) -> Self {
        let export = &config.export;
        Self {
            request_timeout: Duration::from_secs(config.notion.request_timeout_seconds),
            enqueue: RetryPolicy::fixed(
                export.max_retries,
                Duration::from_secs(export.retry_delay_seconds),
            ),
            poll_interval: Duration::from_secs(export.poll_interval_seconds),
            poll_timeout: Duration::from_secs(export.poll_timeout_seconds),
            matching: RetryPolicy::exponential(
                export.match_max_attempts,
                Duration::from_secs(export.match_base_delay_seconds),
                Duration::from_secs(export.match_max_delay_seconds),
            ),
            download_timeout: Duration::from_secs(export.download_timeout_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackupError, NotionError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use test_case::test_case;

    fn matching_policy() -> RetryPolicy {
        RetryPolicy::exponential(20, Duration::from_secs(5), Duration::from_secs(60))
    }

    #[test_case(1, 0)]
    #[test_case(2, 10)]
    #[test_case(3, 20)]
    #[test_case(4, 40)]
    #[test_case(5, 60)]
    #[test_case(20, 60)]
    fn test_exponential_delay_schedule(attempt: u32, expected_secs: u64) {
        assert_eq!(
            matching_policy().delay_before(attempt),
            Duration::from_secs(expected_secs)
        );
    }

    #[test]
    fn test_delay_never_exceeds_cap() {
        let policy = matching_policy();
        for n in 2..=64 {
            let expected = Duration::from_secs((5u64 << (n - 1).min(20)).min(60));
            assert_eq!(policy.delay_before(n), expected, "attempt {n}");
        }
    }

    #[test]
    fn test_fixed_delay_schedule() {
        let policy = RetryPolicy::fixed(3, Duration::from_secs(5));
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(5));
        assert_eq!(policy.delay_before(3), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_run_stops_on_first_value() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));
        let result = policy
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(if attempt == 3 { Some(attempt) } else { None }) }
            })
            .await
            .unwrap();
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_aborts_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let result: Result<Option<()>> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(NotionError::RateLimited("enqueue".into()).into()) }
            })
            .await;
        assert!(matches!(
            result,
            Err(BackupError::Notion(NotionError::RateLimited(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_returns_last_transient_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let result: Result<Option<()>> = policy
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(NotionError::Transient(format!("HTTP 503 #{attempt}")).into()) }
            })
            .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("#3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_timings_from_default_config() {
        let config: BackupConfig = toml::from_str("").unwrap();
        let timings = ProtocolTimings::from_config(&config);
        assert_eq!(timings.poll_interval, Duration::from_secs(10));
        assert_eq!(timings.poll_timeout, Duration::from_secs(1200));
        assert_eq!(timings.enqueue.max_attempts, 3);
        assert_eq!(timings.matching.max_attempts, 20);
        assert_eq!(timings.download_timeout, Duration::from_secs(300));
    }
}
