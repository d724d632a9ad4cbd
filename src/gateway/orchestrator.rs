//! Request orchestration.
//!
//! Every admitted request walks the same state machine:
//!
//! ```text
//! AdmissionCheck ──denied──▶ Rejected
//!       │
//!  CacheLookup ──hit──▶ Done (served_from_cache)
//!       │
//! GenerativeAttempt ──ok──▶ CacheWrite ──▶ Done
//!       │ failure
//! FallbackAttempt ──▶ CacheWrite ──▶ Done
//! ```
//!
//! Only admission can reject. Any generative failure, including a missing
//! provider, lands on the extractive fallback, which cannot fail.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::extractive::{self, ExtractiveSummarizer};
use crate::fingerprint::Fingerprint;
use crate::limiter::{AdmissionLimiter, identity_digest};
use crate::providers::{Generation, GenerativeProvider, RetryPolicy};
use crate::store::KeyValueStore;
use crate::telemetry;
use crate::types::{
    ComponentStatus, HealthChecks, HealthReport, ProviderUsed, RequestLimits, SummaryRequest,
    SummaryResult,
};
use crate::{Result, SummaryError};

/// Orchestration stage, recorded on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AdmissionCheck,
    CacheLookup,
    GenerativeAttempt,
    FallbackAttempt,
    CacheWrite,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::AdmissionCheck => "admission_check",
            Stage::CacheLookup => "cache_lookup",
            Stage::GenerativeAttempt => "generative_attempt",
            Stage::FallbackAttempt => "fallback_attempt",
            Stage::CacheWrite => "cache_write",
        }
    }
}

/// Accumulates per-stage durations; latency is their sum.
struct StageClock {
    mark: Instant,
    total: Duration,
}

impl StageClock {
    fn start() -> Self {
        Self {
            mark: Instant::now(),
            total: Duration::ZERO,
        }
    }

    fn finish(&mut self, stage: Stage) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.mark);
        self.mark = now;
        self.total += elapsed;
        debug!(
            stage = stage.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "stage complete"
        );
    }

    fn latency_ms(&self) -> u64 {
        self.total.as_millis() as u64
    }
}

/// Resilient summarization front door.
///
/// `Send + Sync`; share it behind an `Arc` across tasks. Construct through
/// [`Abridge::builder()`](crate::Abridge::builder).
pub struct Orchestrator {
    provider: Option<Arc<dyn GenerativeProvider>>,
    retry: RetryPolicy,
    cache: ResponseCache,
    limiter: AdmissionLimiter,
    store: Option<Arc<dyn KeyValueStore>>,
    extractive: ExtractiveSummarizer,
    limits: RequestLimits,
    health_timeout: Duration,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        provider: Option<Arc<dyn GenerativeProvider>>,
        retry: RetryPolicy,
        cache: ResponseCache,
        limiter: AdmissionLimiter,
        store: Option<Arc<dyn KeyValueStore>>,
        extractive: ExtractiveSummarizer,
        limits: RequestLimits,
        health_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            retry,
            cache,
            limiter,
            store,
            extractive,
            limits,
            health_timeout,
        }
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    pub fn limiter(&self) -> &AdmissionLimiter {
        &self.limiter
    }

    /// Name of the configured generative provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    /// Validate and summarize a request on behalf of `identity`.
    ///
    /// # Errors
    ///
    /// Only [`SummaryError::Validation`] and [`SummaryError::RateLimited`].
    /// Upstream and store failures are absorbed.
    pub async fn summarize(&self, identity: &str, request: SummaryRequest) -> Result<SummaryResult> {
        if let Err(e) = request.validate(&self.limits) {
            metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => "invalid").increment(1);
            return Err(e);
        }
        self.orchestrate(identity, &request).await
    }

    /// Run the state machine for an already validated request.
    pub async fn orchestrate(
        &self,
        identity: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryResult> {
        let mut clock = StageClock::start();

        let admission = self.limiter.check(identity).await;
        clock.finish(Stage::AdmissionCheck);
        if !admission.allowed {
            let digest = identity_digest(identity);
            info!(
                identity = &digest[..12],
                count = admission.count,
                limit = admission.limit,
                "request rejected"
            );
            record_outcome("rejected", &clock);
            return Err(self.limiter.rejection());
        }

        let fingerprint = Fingerprint::of(request);
        let cached = self.cache.get(&fingerprint).await;
        clock.finish(Stage::CacheLookup);
        if let Some(hit) = cached {
            debug!(fingerprint = fingerprint.short(), "served from cache");
            record_outcome("cached", &clock);
            return Ok(hit.with_latency(clock.latency_ms()));
        }

        let generated = self.generate(request).await;
        clock.finish(Stage::GenerativeAttempt);

        let result = match generated {
            Ok(generation) => {
                self.record_tokens(&generation);
                SummaryResult {
                    summary: generation.summary,
                    provider_used: ProviderUsed::Generative,
                    token_usage: generation.usage,
                    model: generation.model,
                    latency_ms: 0,
                    served_from_cache: false,
                }
            }
            Err(e) => {
                metrics::counter!(telemetry::FALLBACKS_TOTAL, "reason" => e.kind()).increment(1);
                warn!(
                    fingerprint = fingerprint.short(),
                    error = %e,
                    "generative path failed, using extractive fallback"
                );
                let summary = self.extractive.summarize_request(request);
                clock.finish(Stage::FallbackAttempt);
                SummaryResult {
                    summary,
                    provider_used: ProviderUsed::Fallback,
                    token_usage: Default::default(),
                    model: extractive::MODEL_NAME.to_string(),
                    latency_ms: 0,
                    served_from_cache: false,
                }
            }
        };

        self.cache
            .put(&fingerprint, &result.with_latency(clock.latency_ms()))
            .await;
        clock.finish(Stage::CacheWrite);

        let result = result.with_latency(clock.latency_ms());
        record_outcome(result.provider_used.as_str(), &clock);
        info!(
            fingerprint = fingerprint.short(),
            provider_used = result.provider_used.as_str(),
            latency_ms = result.latency_ms,
            "request complete"
        );
        Ok(result)
    }

    async fn generate(&self, request: &SummaryRequest) -> Result<Generation> {
        let Some(provider) = self.provider.as_deref() else {
            return Err(SummaryError::ProviderUnavailable { attempts: 0 });
        };
        self.retry
            .execute(provider.name(), |timeout| provider.generate(request, timeout))
            .await
    }

    fn record_tokens(&self, generation: &Generation) {
        let provider = self.provider_name().unwrap_or("unknown").to_owned();
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider.clone(),
            "direction" => "prompt",
        )
        .increment(u64::from(generation.usage.prompt));
        metrics::counter!(telemetry::TOKENS_TOTAL,
            "provider" => provider,
            "direction" => "completion",
        )
        .increment(u64::from(generation.usage.completion));
    }

    /// Probe the provider and the store concurrently.
    ///
    /// A missing provider reports `error` (only the fallback can serve); a
    /// missing store reports `disabled`.
    pub async fn health(&self) -> HealthReport {
        let started = Instant::now();
        let timeout = self.health_timeout;

        let generative = async {
            let Some(provider) = self.provider.as_deref() else {
                return ComponentStatus::Error;
            };
            match tokio::time::timeout(timeout, provider.probe(timeout)).await {
                Ok(Ok(())) => ComponentStatus::Ok,
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "provider probe failed");
                    ComponentStatus::Error
                }
                Err(_) => {
                    warn!(provider = provider.name(), "provider probe timed out");
                    ComponentStatus::Error
                }
            }
        };

        let store = async {
            let Some(store) = self.store.as_deref() else {
                return ComponentStatus::Disabled;
            };
            match tokio::time::timeout(timeout, store.ping()).await {
                Ok(Ok(())) => ComponentStatus::Ok,
                Ok(Err(e)) => {
                    warn!(store = store.name(), error = %e, "store ping failed");
                    ComponentStatus::Error
                }
                Err(_) => {
                    warn!(store = store.name(), "store ping timed out");
                    ComponentStatus::Error
                }
            }
        };

        let (generative, store) = tokio::join!(generative, store);
        let checks = HealthChecks { generative, store };

        HealthReport {
            status: checks.status(),
            checks,
            latency_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

fn record_outcome(outcome: &'static str, clock: &StageClock) {
    metrics::counter!(telemetry::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "outcome" => outcome)
        .record(clock.total.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn latency_is_sum_of_stages() {
        let mut clock = StageClock::start();
        tokio::time::advance(Duration::from_millis(30)).await;
        clock.finish(Stage::AdmissionCheck);
        tokio::time::advance(Duration::from_millis(12)).await;
        clock.finish(Stage::CacheLookup);
        assert_eq!(clock.latency_ms(), 42);
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::GenerativeAttempt.as_str(), "generative_attempt");
        assert_eq!(Stage::CacheWrite.as_str(), "cache_write");
    }
}
