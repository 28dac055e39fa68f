//! Timeout and bounded retry with exponential backoff for external calls.

use std::future::Future;
use std::time::Duration;

use super::ProviderError;

/// Per-call timeout plus retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_retries: 2,
            backoff: Duration::from_millis(250),
        }
    }
}

/// Run `op` under the policy. A timeout counts as a retryable failure.
///
/// Returns the final result and the number of attempts made.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> (Result<T, ProviderError>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        };

        match outcome {
            Ok(value) => return (Ok(value), attempt + 1),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    call = what,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying external call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return (Err(e), attempt + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(200),
            max_retries,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            backoff: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = with_retry(&fast_policy(3), "flaky", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Status(503))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let (result, attempts): (Result<(), _>, _) = with_retry(&fast_policy(2), "down", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::RateLimited) }
        })
        .await;
        assert!(matches!(result, Err(ProviderError::RateLimited)));
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let (result, attempts): (Result<(), _>, _) = with_retry(&fast_policy(5), "auth", || async {
            Err(ProviderError::Unauthorized("private".to_string()))
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Unauthorized(_))));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried() {
        let calls = AtomicU32::new(0);
        let (result, attempts) = with_retry(&fast_policy(1), "slow", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok::<_, ProviderError>(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(attempts, 2);
    }
}
