//! Bounded retry for provider fetches.
//!
//! Only transient network failures are retried. Everything else is returned
//! to the caller on the first attempt.

use std::future::Future;
use std::time::Duration;

use aimeter_core::{ProviderError, ProviderUsageResponse, UsageProvider};
use tracing::{debug, warn};

/// Policy for retrying failed fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first call (so at most `max_retries + 1` calls).
    pub max_retries: u32,
    /// Delay before each retry.
    pub base_delay: Duration,
    /// Whether to double the delay on each retry.
    pub exponential_backoff: bool,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a fixed-delay policy with the given retry count.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(3),
            exponential_backoff: false,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            exponential_backoff: false,
            max_delay: Duration::ZERO,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Enables or disables exponential backoff.
    #[must_use]
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Calculates the delay before the given retry (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };

        delay.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Runs `op` until it succeeds, fails permanently, or retries run out.
///
/// The last error is returned once the policy is exhausted. Dropping the
/// returned future abandons any pending delay.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && retry < policy.max_retries => {
                retry += 1;
                let delay = policy.delay_for_attempt(retry);
                warn!(
                    provider = label,
                    attempt = retry,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                debug!(provider = label, retries = retry, error = %err, "Giving up");
                return Err(err);
            }
        }
    }
}

/// Fetches usage from `provider`, retrying transient failures per `policy`.
pub async fn fetch_with_retry<P>(
    provider: &P,
    policy: &RetryPolicy,
) -> Result<ProviderUsageResponse, ProviderError>
where
    P: UsageProvider,
{
    let label = provider.display_name().to_string();
    retry_transient(policy, &label, move || provider.fetch_usage()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use aimeter_core::NetworkErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fixed_delay() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(3));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(3));
    }

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::new(5)
            .with_base_delay(Duration::from_secs(1))
            .with_exponential_backoff(true);

        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_max_delay_cap() {
        let policy = RetryPolicy::new(10)
            .with_base_delay(Duration::from_secs(10))
            .with_exponential_backoff(true);

        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(60));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retried_until_exhausted() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = retry_transient(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::network(NetworkErrorKind::Timeout, "timed out")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(matches!(
            result,
            Err(ProviderError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            })
        ));
        assert_eq!(started.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry_transient(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Api { status: 401 }) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result, Err(ProviderError::Api { status: 401 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);

        let result = retry_transient(&RetryPolicy::default(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::network(NetworkErrorKind::ConnectionLost, "reset"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_network_error_not_retried() {
        let calls = AtomicU32::new(0);

        let _ = retry_transient::<(), _, _>(&RetryPolicy::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::network(NetworkErrorKind::Other, "bad redirect")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let calls = AtomicU32::new(0);

        let _ = retry_transient::<(), _, _>(&RetryPolicy::no_retry(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::network(NetworkErrorKind::Timeout, "t")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
