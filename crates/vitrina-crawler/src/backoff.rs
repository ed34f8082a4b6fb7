//! Retry-with-backoff policy shared by every fetch path.
//!
//! Timeouts, network failures, and 403s are treated as potentially transient
//! (anti-bot blocking included) and retried with exponential backoff. 429 is
//! retried only when the site's rate limiting is enabled, honoring a
//! `Retry-After` hint when the server sent one. Everything else propagates
//! immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::CrawlError;

/// Retry policy for one fetch client: attempt cap, backoff base, and whether
/// 429 responses are retried at all.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Base delay in seconds for exponential backoff: `base * 2^attempt`.
    pub backoff_base_secs: u64,
    /// When `false`, a 429 is a terminal failure for the URL.
    pub retry_rate_limited: bool,
}

fn is_retriable(err: &CrawlError, policy: RetryPolicy) -> bool {
    match err {
        CrawlError::Timeout { .. } | CrawlError::Forbidden { .. } | CrawlError::Http(_) => true,
        CrawlError::RateLimited { .. } => policy.retry_rate_limited,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// On a retriable error the function sleeps for `backoff_base_secs *
/// 2^attempt` seconds (or the server's `Retry-After`, for a 429 carrying one)
/// and tries again, up to `max_retries` additional attempts. Non-retriable
/// errors and exhausted retries return the last error.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, CrawlError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CrawlError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err, policy) || attempt >= policy.max_retries {
                    return Err(err);
                }

                let delay_secs = match &err {
                    CrawlError::RateLimited {
                        retry_after_secs: Some(hint),
                        ..
                    } => *hint,
                    // Cap the shift to prevent overflow on extreme configs.
                    _ => policy
                        .backoff_base_secs
                        .saturating_mul(1u64 << attempt.min(62)),
                };
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_secs,
                    error = %err,
                    "transient fetch error — retrying after backoff"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    const NO_BACKOFF: RetryPolicy = RetryPolicy {
        max_retries: 3,
        backoff_base_secs: 0,
        retry_rate_limited: true,
    };

    fn rate_limited() -> CrawlError {
        CrawlError::RateLimited {
            url: "https://shop.example.com/p/1".to_owned(),
            retry_after_secs: Some(0),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(NO_BACKOFF, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, CrawlError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_timeout_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(NO_BACKOFF, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(CrawlError::Timeout {
                        url: "https://shop.example.com".to_owned(),
                    })
                } else {
                    Ok::<u32, CrawlError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rate_limited_retried_up_to_cap_then_terminal() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(NO_BACKOFF, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CrawlError>(rate_limited())
            }
        })
        .await;
        // max_retries=3 → 4 total attempts, then terminal.
        assert_eq!(call_count.load(Ordering::SeqCst), 4);
        assert!(matches!(result, Err(CrawlError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn rate_limited_is_terminal_when_disabled() {
        let policy = RetryPolicy {
            retry_rate_limited: false,
            ..NO_BACKOFF
        };
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(policy, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CrawlError>(rate_limited())
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CrawlError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn forbidden_is_retried_then_surfaces_as_forbidden() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(NO_BACKOFF, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CrawlError>(CrawlError::Forbidden {
                    url: "https://shop.example.com/p/1".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 4);
        assert!(matches!(result, Err(CrawlError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn does_not_retry_unexpected_status() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(NO_BACKOFF, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, CrawlError>(CrawlError::UnexpectedStatus {
                    status: 500,
                    url: "https://shop.example.com/p/1".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CrawlError::UnexpectedStatus { .. })));
    }
}
