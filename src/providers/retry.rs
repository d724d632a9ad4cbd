//! Retry configuration, delay calculation, and the retry executor.
//!
//! [`RetryConfig`] controls backoff; [`RetryPolicy::execute`] drives an
//! operation through bounded attempts, each under its own timeout.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::telemetry;
use crate::{Result, SummaryError};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use abridge::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .base_delay(Duration::from_millis(200))
///     .attempt_timeout(Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub base_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
    /// Whether to add random jitter in `[0, base_delay)`. Default: true.
    pub jitter: bool,
    /// Timeout applied to every individual attempt. Default: 8s.
    pub attempt_timeout: Duration,
    /// Overall budget for all attempts and sleeps. Default: none.
    pub deadline: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
            attempt_timeout: Duration::from_secs(8),
            deadline: None,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request). Values below 1
    /// are treated as 1.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Backoff before the retry that follows attempt `attempt` (1-indexed),
    /// without jitter: `base_delay * 2^(attempt-1)`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }

    /// Full delay: backoff plus jitter, raised to at least a `retry_after`
    /// hint, always capped at `max_delay`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let mut delay = self.delay_for_attempt(attempt);
        if self.jitter {
            delay = delay.saturating_add(self.jitter_sample());
        }
        if let Some(hint) = retry_after {
            delay = delay.max(hint);
        }
        delay.min(self.max_delay)
    }

    fn jitter_sample(&self) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        if base_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..base_ms))
    }
}

/// Executes fallible provider operations under a [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the timeout of the current attempt and is additionally
    /// wrapped in [`tokio::time::timeout`]; an elapsed attempt counts as
    /// [`SummaryError::ProviderTimeout`]. Transient errors (per
    /// [`SummaryError::is_transient`]) are retried with backoff; any other
    /// error is returned immediately. Exhaustion yields a single
    /// [`SummaryError::ProviderUnavailable`].
    ///
    /// Dropping the returned future stops retrying and cancels the running
    /// attempt.
    pub async fn execute<F, Fut, T>(&self, provider: &str, mut op: F) -> Result<T>
    where
        F: FnMut(Duration) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let deadline = self.config.deadline.map(|d| Instant::now() + d);
        let mut attempts = 0u32;

        while attempts < self.config.max_attempts {
            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    self.config.attempt_timeout.min(remaining)
                }
                None => self.config.attempt_timeout,
            };

            attempts += 1;
            let outcome = match tokio::time::timeout(timeout, op(timeout)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SummaryError::ProviderTimeout(timeout)),
            };

            let err = match outcome {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(provider, attempts, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => e,
                Err(e) => {
                    debug!(provider, attempt = attempts, error = %e, "fatal provider error");
                    return Err(e);
                }
            };

            if attempts >= self.config.max_attempts {
                warn!(
                    provider,
                    attempt = attempts,
                    error = %err,
                    "transient error on final attempt"
                );
                break;
            }

            let mut delay = self.config.effective_delay(attempts, err.retry_after());
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if delay >= remaining {
                    warn!(
                        provider,
                        attempt = attempts,
                        error = %err,
                        "retry deadline reached"
                    );
                    break;
                }
                delay = delay.min(remaining);
            }

            metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => provider.to_owned())
                .increment(1);
            warn!(
                provider,
                attempt = attempts,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying after transient error"
            );
            tokio::time::sleep(delay).await;
        }

        Err(SummaryError::ProviderUnavailable { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let config = RetryConfig::new()
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350))
            .jitter(false);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(350));
    }

    #[test]
    fn retry_after_raises_delay_but_stays_capped() {
        let config = RetryConfig::new()
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(2))
            .jitter(false);
        assert_eq!(
            config.effective_delay(1, Some(Duration::from_secs(1))),
            Duration::from_secs(1)
        );
        assert_eq!(
            config.effective_delay(1, Some(Duration::from_millis(10))),
            Duration::from_millis(100)
        );
        assert_eq!(
            config.effective_delay(1, Some(Duration::from_secs(60))),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn jitter_stays_below_base() {
        let config = RetryConfig::new().base_delay(Duration::from_millis(50));
        for _ in 0..100 {
            let delay = config.effective_delay(1, None);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay < Duration::from_millis(100));
        }
    }

    #[test]
    fn max_attempts_floor_is_one() {
        assert_eq!(RetryConfig::new().max_attempts(0).max_attempts, 1);
    }
}
