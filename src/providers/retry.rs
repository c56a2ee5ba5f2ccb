//! Retry with exponential backoff
//!
//! Transient upstream failures (429/503, network errors, timeouts) are
//! retried up to an attempt cap with `base * 2^(attempt - 1)` delays. An
//! upstream-supplied Retry-After hint takes precedence over the computed
//! backoff. Permanent failures return immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

/// Run `op` up to `max_attempts` times, sleeping between transient failures.
pub async fn with_retries<T, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= max_attempts || !err.is_transient() {
                    return Err(err);
                }

                let delay = err
                    .retry_after()
                    .unwrap_or_else(|| base_delay * 2u32.saturating_pow(attempt - 1));
                warn!(
                    "Transient upstream failure (attempt {}/{}): {}; retrying in {:?}",
                    attempt, max_attempts, err, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn throttled() -> AppError {
        AppError::Upstream {
            status: 429,
            retry_after: None,
        }
    }

    #[tokio::test]
    async fn test_always_throttled_is_tried_exactly_max_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retries(3, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(throttled()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = with_retries(5, Duration::ZERO, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AppError::Upstream {
                    status: 404,
                    retry_after: None,
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = with_retries(3, Duration::ZERO, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(throttled())
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_hint_preferred() {
        // A large computed backoff would stall the test; the hint keeps the
        // delay at zero.
        let calls = AtomicU32::new(0);

        let result = with_retries(2, Duration::from_secs(60), || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(AppError::Upstream {
                        status: 429,
                        retry_after: Some(Duration::ZERO),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
