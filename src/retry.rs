//! Retry logic with exponential backoff
//!
//! Transient failures (network timeouts, connection resets) are retried with
//! exponential backoff and optional jitter. The retry loop is invoked by the
//! orchestrator around whole job attempts; the fetch primitive itself never
//! retries, so every attempt is bounded and observable.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets) should return `true`.
/// Permanent failures (invalid source, transcode fault, disk error) should
/// return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self.root() {
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            // Resolution failures are permanent for a given identifier
            Error::InvalidSource { .. } => false,
            // A descriptor that is not offered will not appear on retry
            Error::StreamUnavailable(_) => false,
            // Engine faults are permanent; raw inputs are retained for diagnosis
            Error::Transcode(_) => false,
            // Tag write failures indicate a bad target file, not a transient fault
            Error::Tag { .. } => false,
            // Degradations never fail a job in the first place
            Error::MetadataDegraded(_) => false,
            // root() already unwrapped any stage annotation
            Error::Stage { .. } => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result, or the last error once the error is
/// non-retryable or `config.max_attempts` retries are exhausted.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "operation failed, retrying"
                );

                let jittered = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered).await;

                let next = Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next.min(config.max_delay);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    attempts = attempt + 1,
                    retryable = e.is_retryable(),
                    "operation failed permanently"
                );
                return Err(e);
            }
        }
    }
}

/// Add up to 25% random jitter to a delay
fn add_jitter(delay: Duration) -> Duration {
    let jitter_factor = rand::thread_rng().gen_range(0.0..0.25);
    delay + Duration::from_secs_f64(delay.as_secs_f64() * jitter_factor)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl IsRetryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError::Transient)
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_config(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Permanent)
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded_by_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_config(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TestError::Transient)
        })
        .await;
        assert!(result.is_err());
        // 1 initial attempt + 3 retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn stream_unavailable_is_permanent() {
        let err = Error::StreamUnavailable("format 251 not offered".into());
        assert!(!err.is_retryable());
    }

    #[test]
    fn stage_wrapper_delegates_to_inner_error() {
        let inner = Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        let wrapped = Error::at_stage(crate::types::JobStage::Fetching, inner);
        assert!(wrapped.is_retryable());
    }
}
