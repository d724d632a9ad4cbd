//! In-process store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;
use tokio::time::Instant;

use super::{KeyValueStore, StoreResult};

/// Default maximum number of stored values.
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Elapsed windows are swept once every this many increments.
const PURGE_INTERVAL: u64 = 1_024;

#[derive(Clone)]
struct StoredValue {
    value: String,
    ttl: Duration,
}

/// Expires each value after its own ttl.
struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: std::time::Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Counter for one identity's current fixed window.
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u64,
    window: Duration,
}

impl RateWindow {
    fn open(now: Instant, window: Duration) -> Self {
        Self {
            window_start: now,
            count: 0,
            window,
        }
    }

    fn elapsed(&self, now: Instant) -> bool {
        now.duration_since(self.window_start) >= self.window
    }
}

/// Process-local [`KeyValueStore`].
///
/// Values live in a bounded moka cache with per-entry ttl. Window counters
/// live in a `DashMap`; an increment holds only its own entry's shard lock,
/// so distinct identities never contend on a global lock.
pub struct MemoryStore {
    values: Cache<String, StoredValue>,
    windows: DashMap<String, RateWindow>,
    increments: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store holding at most `max` values.
    pub fn with_max_entries(max: u64) -> Self {
        let values = Cache::builder()
            .max_capacity(max)
            .expire_after(PerEntryTtl)
            .build();
        Self {
            values,
            windows: DashMap::new(),
            increments: AtomicU64::new(0),
        }
    }

    /// Snapshot of the window tracked for `key`, if any.
    pub fn window(&self, key: &str) -> Option<RateWindow> {
        self.windows.get(key).map(|w| *w)
    }

    /// Number of tracked windows, elapsed ones included until the next sweep.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window that has elapsed.
    pub fn purge_elapsed(&self) {
        let now = Instant::now();
        self.windows.retain(|_, w| !w.elapsed(now));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.get(key).await.map(|stored| stored.value))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        self.values
            .insert(key.to_string(), StoredValue { value, ttl })
            .await;
        Ok(())
    }

    async fn increment_in_window(&self, key: &str, window: Duration) -> StoreResult<u64> {
        let now = Instant::now();
        let count = {
            let mut entry = self
                .windows
                .entry(key.to_string())
                .or_insert_with(|| RateWindow::open(now, window));
            if entry.elapsed(now) {
                *entry = RateWindow::open(now, window);
            }
            entry.count += 1;
            entry.count
        };

        if self.increments.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_elapsed();
        }

        Ok(count)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
