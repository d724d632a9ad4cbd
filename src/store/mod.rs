//! Keyed storage shared by the result cache and the admission limiter.
//!
//! Both consumers talk to a [`KeyValueStore`] and treat every failure as a
//! degradation signal, never as a request error. Two backends ship:
//!
//! - [`MemoryStore`]: process-local, moka for values and a `DashMap` of
//!   fixed windows for counters.
//! - [`RedisStore`] (feature `redis`): shared across processes, atomic
//!   window increments through a Lua script.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::{MemoryStore, RateWindow};
#[cfg(feature = "redis")]
pub use self::redis::RedisStore;

/// Failure of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store connection failed: {0}")]
    Connection(String),

    #[error("store command failed: {0}")]
    Command(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Minimal key-value capability needed by the cache and the limiter.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch a value. Absent or expired keys yield `Ok(None)`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store a value that expires after `ttl`. Overwrites any previous value.
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()>;

    /// Atomically increment the counter of the current fixed window for
    /// `key` and return the post-increment count.
    ///
    /// The first increment opens a window of length `window`; once it has
    /// elapsed the next increment starts a new window at 1.
    async fn increment_in_window(&self, key: &str, window: Duration) -> StoreResult<u64>;

    /// Reachability check.
    async fn ping(&self) -> StoreResult<()>;
}
