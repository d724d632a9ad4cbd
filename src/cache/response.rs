//! Result cache keyed by request fingerprint.
//!
//! [`ResponseCache`] stores finished [`SummaryResult`]s as JSON in a
//! [`KeyValueStore`] so equivalent requests are answered without calling
//! the provider again. Entries carry their own ttl; absence, eviction,
//! expiry and undecodable entries all read as a miss.
//!
//! # Degradation
//!
//! The cache never fails a request. A store error on lookup is a miss, a
//! store error on write is dropped; both log at `warn` and bump
//! `abridge_store_errors_total{component="cache"}`. Without a store the
//! cache is a no-op that always misses.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::SummaryError;
use crate::fingerprint::Fingerprint;
use crate::store::KeyValueStore;
use crate::telemetry;
use crate::types::SummaryResult;

/// Configuration for the result cache.
///
/// ```rust
/// # use abridge::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries held by an in-memory store. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for cached results. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Stored form of a cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    /// Always stored with `served_from_cache = false`.
    pub result: SummaryResult,
    pub stored_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl CacheEntry {
    fn new(fingerprint: &Fingerprint, result: &SummaryResult, ttl: Duration) -> Self {
        Self {
            fingerprint: fingerprint.clone(),
            result: result.with_served_from_cache(false),
            stored_at: Utc::now(),
            ttl_secs: ttl.as_secs(),
        }
    }
}

/// Fingerprint-keyed result cache over an optional [`KeyValueStore`].
#[derive(Clone)]
pub struct ResponseCache {
    store: Option<Arc<dyn KeyValueStore>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Option<Arc<dyn KeyValueStore>>, config: &CacheConfig) -> Self {
        Self {
            store,
            ttl: config.ttl,
        }
    }

    /// A cache without a store: every lookup misses, every write is dropped.
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl: CacheConfig::default().ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a cached result.
    ///
    /// A hit returns the stored result with `served_from_cache = true`.
    /// Emits cache hit/miss metrics.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<SummaryResult> {
        let Some(store) = &self.store else {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            return None;
        };

        let raw = match store.get(&fingerprint.cache_key()).await {
            Ok(raw) => raw,
            Err(e) => {
                store_error(SummaryError::CacheUnavailable(e.to_string()), "lookup");
                None
            }
        };

        let entry = raw.and_then(|raw| match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(fingerprint = fingerprint.short(), error = %e, "discarding undecodable cache entry");
                None
            }
        });

        match entry {
            Some(entry) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(entry.result.with_served_from_cache(true))
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Store a result under the configured ttl. Last write wins.
    pub async fn put(&self, fingerprint: &Fingerprint, result: &SummaryResult) {
        self.put_with_ttl(fingerprint, result, self.ttl).await;
    }

    /// Store a result under an explicit ttl.
    pub async fn put_with_ttl(
        &self,
        fingerprint: &Fingerprint,
        result: &SummaryResult,
        ttl: Duration,
    ) {
        let Some(store) = &self.store else {
            return;
        };

        let entry = CacheEntry::new(fingerprint, result, ttl);
        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                store_error(SummaryError::Json(e), "write");
                return;
            }
        };

        if let Err(e) = store.set_with_ttl(&fingerprint.cache_key(), raw, ttl).await {
            store_error(SummaryError::CacheUnavailable(e.to_string()), "write");
        }
    }
}

fn store_error(error: SummaryError, operation: &'static str) {
    metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "component" => "cache").increment(1);
    warn!(operation, error = %error, "cache degraded");
}
