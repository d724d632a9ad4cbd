//! Builder for configuring orchestrator instances

use std::sync::Arc;
use std::time::Duration;

use super::Orchestrator;
use crate::cache::{CacheConfig, ResponseCache};
use crate::extractive::{ExtractiveConfig, ExtractiveSummarizer};
use crate::limiter::{AdmissionLimiter, RateLimitConfig};
use crate::providers::{GenerativeProvider, OpenAiProvider, RetryConfig, RetryPolicy};
use crate::store::{KeyValueStore, MemoryStore};
use crate::types::RequestLimits;
use crate::{Result, SummaryError};

/// Default timeout for each health probe.
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Main entry point for creating orchestrator instances.
pub struct Abridge;

impl Abridge {
    /// Create a new builder for configuring the orchestrator.
    pub fn builder() -> AbridgeBuilder {
        AbridgeBuilder::new()
    }
}

/// Where the cache and the limiter keep their state.
enum StoreChoice {
    None,
    Memory,
    Custom(Arc<dyn KeyValueStore>),
}

/// Builder for configuring orchestrator instances.
///
/// ```rust
/// # use abridge::{Abridge, RateLimitConfig, RetryConfig};
/// # use std::time::Duration;
/// let orchestrator = Abridge::builder()
///     .openai("sk-your-key")
///     .retry(RetryConfig::new().max_attempts(2))
///     .memory_store()
///     .rate_limit(RateLimitConfig::new().requests(20))
///     .build()
///     .unwrap();
/// assert_eq!(orchestrator.provider_name(), Some("openai"));
/// ```
pub struct AbridgeBuilder {
    provider: Option<Arc<dyn GenerativeProvider>>,
    openai_key: Option<String>,
    openai_base_url: Option<String>,
    openai_model: Option<String>,
    retry: RetryConfig,
    cache: CacheConfig,
    rate_limit: RateLimitConfig,
    limits: RequestLimits,
    extractive: ExtractiveConfig,
    store: StoreChoice,
    health_timeout: Duration,
}

impl AbridgeBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            openai_key: None,
            openai_base_url: None,
            openai_model: None,
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            limits: RequestLimits::default(),
            extractive: ExtractiveConfig::default(),
            store: StoreChoice::None,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    /// Use a custom generative provider. Takes precedence over [`openai`](Self::openai).
    pub fn provider(mut self, provider: Arc<dyn GenerativeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Configure the OpenAI provider.
    pub fn openai(mut self, api_key: impl Into<String>) -> Self {
        self.openai_key = Some(api_key.into());
        self
    }

    /// Point the OpenAI provider at an OpenAI-compatible endpoint.
    pub fn openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = Some(url.into());
        self
    }

    /// Model requested from the OpenAI provider.
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Result cache settings. Only effective with a store configured.
    pub fn response_cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Admission limit settings. Only effective with a store configured.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn extractive(mut self, config: ExtractiveConfig) -> Self {
        self.extractive = config;
        self
    }

    /// Back the cache and the limiter with a process-local store.
    pub fn memory_store(mut self) -> Self {
        self.store = StoreChoice::Memory;
        self
    }

    /// Back the cache and the limiter with a custom store (e.g. Redis).
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = StoreChoice::Custom(store);
        self
    }

    /// Timeout for each dependency probe in [`Orchestrator::health`].
    pub fn health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.limits.min_output_tokens > self.limits.max_output_tokens {
            return Err(SummaryError::Configuration(format!(
                "min_output_tokens ({}) exceeds max_output_tokens ({})",
                self.limits.min_output_tokens, self.limits.max_output_tokens
            )));
        }
        if self.limits.max_text_length == 0 {
            return Err(SummaryError::Configuration(
                "max_text_length must be positive".into(),
            ));
        }
        if self.rate_limit.requests == 0 || self.rate_limit.window.is_zero() {
            return Err(SummaryError::Configuration(
                "rate limit requests and window must be positive".into(),
            ));
        }
        if self.retry.attempt_timeout.is_zero() {
            return Err(SummaryError::Configuration(
                "attempt_timeout must be positive".into(),
            ));
        }
        if self.cache.ttl.is_zero() {
            return Err(SummaryError::Configuration(
                "cache ttl must be positive".into(),
            ));
        }
        if self.extractive.chars_per_token == 0 {
            return Err(SummaryError::Configuration(
                "chars_per_token must be positive".into(),
            ));
        }
        let damping = self.extractive.damping;
        if !(damping > 0.0 && damping < 1.0) {
            return Err(SummaryError::Configuration(format!(
                "damping ({damping}) must lie strictly between 0 and 1"
            )));
        }
        Ok(())
    }

    /// Build the orchestrator.
    ///
    /// Without any provider every request is served by the extractive
    /// fallback. Without a store the cache and the limiter are disabled.
    pub fn build(self) -> Result<Orchestrator> {
        self.validate()?;

        let provider = match (self.provider, self.openai_key) {
            (Some(provider), _) => Some(provider),
            (None, Some(key)) => {
                let mut openai = match self.openai_base_url {
                    Some(url) => OpenAiProvider::with_base_url(key, url),
                    None => OpenAiProvider::new(key),
                };
                if let Some(model) = self.openai_model {
                    openai = openai.with_model(model);
                }
                Some(Arc::new(openai) as Arc<dyn GenerativeProvider>)
            }
            (None, None) => None,
        };

        let store: Option<Arc<dyn KeyValueStore>> = match self.store {
            StoreChoice::None => None,
            StoreChoice::Memory => Some(Arc::new(MemoryStore::with_max_entries(
                self.cache.max_entries,
            ))),
            StoreChoice::Custom(store) => Some(store),
        };

        Ok(Orchestrator::new(
            provider,
            RetryPolicy::new(self.retry),
            ResponseCache::new(store.clone(), &self.cache),
            AdmissionLimiter::new(store.clone(), self.rate_limit),
            store,
            ExtractiveSummarizer::new(self.extractive),
            self.limits,
            self.health_timeout,
        ))
    }
}

impl Default for AbridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
