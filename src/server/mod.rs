//! HTTP service mode (feature `server`).
//!
//! - [`config`]: TOML configuration and secrets loading
//! - [`http`]: axum router, authentication and error mapping

pub mod config;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

pub use config::{Config, Secrets};
pub use http::{AppState, router};

use crate::store::{KeyValueStore, MemoryStore};
use crate::{Abridge, Orchestrator, Result};

/// Assemble an orchestrator from loaded configuration.
///
/// Without an `openai_api_key` the service runs extractive-only. A Redis
/// store is connected lazily, so an unreachable Redis does not prevent
/// startup.
pub fn build_orchestrator(config: &Config, secrets: &Secrets) -> Result<Orchestrator> {
    let mut builder = Abridge::builder()
        .retry(config.retry_config())
        .limits(config.request_limits())
        .response_cache(config.cache_config())
        .rate_limit(config.rate_limit_config())
        .health_timeout(Duration::from_millis(config.provider.probe_timeout_ms));

    match &secrets.openai_api_key {
        Some(key) => {
            builder = builder
                .openai(key.clone())
                .openai_base_url(config.provider.base_url.clone())
                .openai_model(config.provider.model.clone());
        }
        None => info!("no provider key configured, serving extractive summaries only"),
    }

    if let Some(store) = build_store(config)? {
        builder = builder.store(store);
    }

    builder.build()
}

fn build_store(config: &Config) -> Result<Option<Arc<dyn KeyValueStore>>> {
    use config::StoreBackend;

    match config.store.backend {
        StoreBackend::None => Ok(None),
        StoreBackend::Memory => Ok(Some(Arc::new(MemoryStore::with_max_entries(
            config.cache.max_entries,
        )))),
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            let store = crate::store::RedisStore::new(&config.store.redis_url)
                .map_err(|e| crate::SummaryError::Configuration(e.to_string()))?
                .op_timeout(Duration::from_millis(config.store.op_timeout_ms))
                .reconnect_backoff(Duration::from_millis(config.store.reconnect_backoff_ms));
            Ok(Some(Arc::new(store)))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => Err(crate::SummaryError::Configuration(
            "store backend \"redis\" requires the `redis` feature".into(),
        )),
    }
}
