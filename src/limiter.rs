//! Per-identity admission control.
//!
//! Fixed-window counting over a [`KeyValueStore`]: each call increments the
//! identity's counter for the current window, and the request is admitted
//! iff the post-increment count is within the limit. Denied requests count
//! too, so a client hammering the service stays denied until its window
//! elapses.
//!
//! The limiter fails open. Store errors are logged at `warn` and the
//! request is admitted; without a store every request is admitted.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::SummaryError;
use crate::store::KeyValueStore;
use crate::telemetry;

/// Store key prefix for window counters.
const KEY_PREFIX: &str = "ratelimit:";

/// Rate limit settings.
///
/// ```rust
/// # use abridge::RateLimitConfig;
/// # use std::time::Duration;
/// let config = RateLimitConfig::new()
///     .requests(20)
///     .window(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Requests admitted per identity per window. Default: 100.
    pub requests: u64,
    /// Window length. Default: 60s.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(mut self, n: u64) -> Self {
        self.requests = n;
        self
    }

    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Post-increment count in the current window; 0 when not counted.
    pub count: u64,
    pub limit: u64,
}

/// Fixed-window rate limiter keyed by caller identity.
#[derive(Clone)]
pub struct AdmissionLimiter {
    store: Option<Arc<dyn KeyValueStore>>,
    config: RateLimitConfig,
}

impl AdmissionLimiter {
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// A limiter that admits everything.
    pub fn disabled() -> Self {
        Self::new(None, RateLimitConfig::default())
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether `identity` may proceed.
    pub async fn allow(&self, identity: &str) -> bool {
        self.check(identity).await.allowed
    }

    /// Count this request against `identity` and decide admission.
    pub async fn check(&self, identity: &str) -> Admission {
        let limit = self.config.requests;
        let open = Admission {
            allowed: true,
            count: 0,
            limit,
        };

        let Some(store) = &self.store else {
            return open;
        };

        let digest = identity_digest(identity);
        let key = format!("{KEY_PREFIX}{digest}");
        match store.increment_in_window(&key, self.config.window).await {
            Ok(count) => {
                let allowed = count <= limit;
                if !allowed {
                    metrics::counter!(telemetry::ADMISSION_DENIED_TOTAL).increment(1);
                    debug!(identity = &digest[..12], count, limit, "admission denied");
                }
                Admission {
                    allowed,
                    count,
                    limit,
                }
            }
            Err(e) => {
                let error = SummaryError::LimiterStoreUnavailable(e.to_string());
                metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "component" => "limiter")
                    .increment(1);
                warn!(identity = &digest[..12], error = %error, "admitting request without limiter");
                open
            }
        }
    }

    /// The error returned to a denied caller.
    pub fn rejection(&self) -> SummaryError {
        SummaryError::RateLimited {
            limit: self.config.requests,
            window: self.config.window,
        }
    }
}

/// Identities are only ever stored and logged as SHA-256 digests.
pub(crate) fn identity_digest(identity: &str) -> String {
    format!("{:x}", Sha256::digest(identity.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_hides_identity() {
        let digest = identity_digest("10.0.0.1");
        assert_eq!(digest.len(), 64);
        assert!(!digest.contains("10.0.0.1"));
        assert_eq!(digest, identity_digest("10.0.0.1"));
    }

    #[tokio::test]
    async fn disabled_limiter_always_admits() {
        let limiter = AdmissionLimiter::disabled();
        for _ in 0..1_000 {
            assert!(limiter.allow("anyone").await);
        }
    }
}
