//! Redis-backed store, shared across processes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{KeyValueStore, StoreError, StoreResult};

/// Default bound on every Redis operation, connecting included.
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(250);

/// Default pause between connect attempts.
const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// INCR the window counter and start its expiry on the first hit.
const INCREMENT_IN_WINDOW: &str = r#"
local count = redis.call("INCR", KEYS[1])
if count == 1 then
    redis.call("PEXPIRE", KEYS[1], ARGV[1])
end
return count
"#;

/// Redis [`KeyValueStore`].
///
/// The connection is established lazily on first use, so an unreachable
/// Redis at startup only degrades the cache and the limiter.
///
/// Only one connect attempt runs at a time. Operations issued while it is
/// in flight, or within `reconnect_backoff` of its start, fail immediately
/// with [`StoreError::Connection`]. Every operation, connecting included,
/// completes within `op_timeout`.
pub struct RedisStore {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    op_timeout: Duration,
    reconnect_backoff: Duration,
    epoch: Instant,
    /// Millis since `epoch` before which no new connect may start; 0 when unset.
    next_connect_ms: AtomicU64,
    increment: redis::Script,
}

impl RedisStore {
    /// Create a store for `url` (e.g. `redis://localhost:6379/0`).
    ///
    /// Only parses the URL; no connection is made yet.
    pub fn new(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            op_timeout: DEFAULT_OP_TIMEOUT,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            epoch: Instant::now(),
            next_connect_ms: AtomicU64::new(0),
            increment: redis::Script::new(INCREMENT_IN_WINDOW),
        })
    }

    /// Bound every operation (including connecting) by `timeout`.
    pub fn op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Minimum spacing between connect attempts while Redis is unreachable.
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Claim the right to start a connect attempt.
    fn claim_connect(&self) -> bool {
        let now = self.now_ms();
        let next = self.next_connect_ms.load(Ordering::Acquire);
        if now < next {
            return false;
        }
        let until = now + (self.reconnect_backoff.as_millis() as u64).max(1);
        self.next_connect_ms
            .compare_exchange(next, until, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        if let Some(manager) = self.connection.get() {
            return Ok(manager.clone());
        }
        if !self.claim_connect() {
            debug!("redis connect in flight or backing off");
            return Err(StoreError::Connection("reconnect backoff".into()));
        }

        let manager = self
            .connection
            .get_or_try_init(|| async {
                let manager = self
                    .client
                    .get_connection_manager()
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))
                    .inspect_err(|e| warn!(error = %e, "redis connection failed"))?;
                info!("connected to redis");
                Ok::<_, StoreError>(manager)
            })
            .await?;
        self.next_connect_ms.store(0, Ordering::Release);
        Ok(manager.clone())
    }

    /// Run `op` (connection acquisition included) under `op_timeout`.
    async fn bounded<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout))?
    }
}

fn command_error(e: redis::RedisError) -> StoreError {
    if e.is_io_error() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let value: Option<String> = conn.get(key).await.map_err(command_error)?;
            Ok(value)
        })
        .await
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> StoreResult<()> {
        let secs = ttl.as_secs().max(1);
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _: () = conn.set_ex(key, value, secs).await.map_err(command_error)?;
            Ok(())
        })
        .await
    }

    async fn increment_in_window(&self, key: &str, window: Duration) -> StoreResult<u64> {
        let window_ms = (window.as_millis() as u64).max(1);
        self.bounded(async {
            let mut conn = self.connection().await?;
            let count: u64 = self
                .increment
                .key(key)
                .arg(window_ms)
                .invoke_async(&mut conn)
                .await
                .map_err(command_error)?;
            Ok(count)
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.bounded(async {
            let mut conn = self.connection().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(command_error)?;
            Ok(())
        })
        .await
    }
}
