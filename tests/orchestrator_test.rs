//! End-to-end orchestration tests against mock providers and stores.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use abridge::store::StoreResult;
use abridge::{
    Abridge, CacheConfig, ComponentStatus, Generation, GenerativeProvider, HealthStatus,
    KeyValueStore, Orchestrator, ProviderUsed, RateLimitConfig, RequestLimits, Result,
    RetryConfig, StoreError, SummaryError, SummaryRequest, TokenUsage, Tone,
};

// ============================================================================
// Mocks
// ============================================================================

/// Provider that replays scripted outcomes, then succeeds forever.
struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Generation>>>,
    calls: AtomicU32,
    latency: Duration,
    probe_ok: bool,
}

impl ScriptedProvider {
    fn ok() -> Arc<Self> {
        Self::with_script(Vec::new())
    }

    fn with_script(script: Vec<Result<Generation>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicU32::new(0),
            latency: Duration::ZERO,
            probe_ok: true,
        })
    }

    fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            latency,
            probe_ok: true,
        })
    }

    fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
            latency: Duration::ZERO,
            probe_ok: false,
        })
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

fn generation(summary: &str) -> Generation {
    Generation {
        summary: summary.to_string(),
        usage: TokenUsage::new(50, 12),
        model: "mock-model-2024".to_string(),
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, _request: &SummaryRequest, _timeout: Duration) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(generation("The generated summary of the text.")))
    }

    async fn probe(&self, _timeout: Duration) -> Result<()> {
        if self.probe_ok {
            Ok(())
        } else {
            Err(SummaryError::ProviderServerError {
                status: 503,
                message: "down".into(),
            })
        }
    }
}

/// Provider whose calls never complete.
struct HangingProvider {
    calls: AtomicU32,
}

#[async_trait]
impl GenerativeProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    fn model(&self) -> &str {
        "hanging-model"
    }

    async fn generate(&self, _request: &SummaryRequest, _timeout: Duration) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        std::future::pending().await
    }

    async fn probe(&self, _timeout: Duration) -> Result<()> {
        std::future::pending().await
    }
}

/// Store that refuses every operation.
struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    fn name(&self) -> &str {
        "broken"
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn set_with_ttl(&self, _key: &str, _value: String, _ttl: Duration) -> StoreResult<()> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn increment_in_window(&self, _key: &str, _window: Duration) -> StoreResult<u64> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn ping(&self) -> StoreResult<()> {
        Err(StoreError::Connection("refused".into()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

const ARTICLE: &str = "Rust is a systems programming language. \
    It focuses on memory safety without garbage collection. \
    The borrow checker enforces ownership rules at compile time. \
    Many companies use Rust for infrastructure software. \
    Cargo is the Rust package manager and build tool.";

fn fast_retry() -> RetryConfig {
    RetryConfig::new()
        .max_attempts(3)
        .base_delay(Duration::from_millis(10))
        .jitter(false)
        .attempt_timeout(Duration::from_secs(1))
}

fn orchestrator(provider: Arc<dyn GenerativeProvider>) -> Orchestrator {
    Abridge::builder()
        .provider(provider)
        .retry(fast_retry())
        .memory_store()
        .build()
        .unwrap()
}

// ============================================================================
// Generative path and cache
// ============================================================================

#[tokio::test(start_paused = true)]
async fn generative_success_is_reported() {
    let provider = ScriptedProvider::ok();
    let orchestrator = orchestrator(provider.clone());

    let result = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert_eq!(result.provider_used, ProviderUsed::Generative);
    assert_eq!(result.summary, "The generated summary of the text.");
    assert_eq!(result.token_usage, TokenUsage::new(50, 12));
    assert_eq!(result.model, "mock-model-2024");
    assert!(!result.served_from_cache);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_request_is_served_from_cache() {
    let provider = ScriptedProvider::slow(Duration::from_millis(50));
    let orchestrator = orchestrator(provider.clone());

    let first = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();
    let second = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 1);
    assert!(!first.served_from_cache);
    assert!(second.served_from_cache);
    assert_eq!(second.summary, first.summary);
    assert_eq!(second.provider_used, first.provider_used);
    assert_eq!(second.token_usage, first.token_usage);
    assert!(first.latency_ms >= 50);
    assert!(second.latency_ms < first.latency_ms);
}

#[tokio::test(start_paused = true)]
async fn whitespace_variants_hit_the_same_entry() {
    let provider = ScriptedProvider::ok();
    let orchestrator = orchestrator(provider.clone());

    orchestrator
        .summarize("client", SummaryRequest::new("First sentence here. Second one."))
        .await
        .unwrap();
    let hit = orchestrator
        .summarize(
            "client",
            SummaryRequest::new("  First sentence   here.\n\nSecond one.  "),
        )
        .await
        .unwrap();

    assert!(hit.served_from_cache);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn different_tone_misses_the_cache() {
    let provider = ScriptedProvider::ok();
    let orchestrator = orchestrator(provider.clone());

    orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();
    let other = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE).tone(Tone::Bullet))
        .await
        .unwrap();

    assert!(!other.served_from_cache);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_before_success() {
    let provider = ScriptedProvider::with_script(vec![
        Err(SummaryError::ProviderServerError {
            status: 502,
            message: "bad gateway".into(),
        }),
        Err(SummaryError::ProviderTimeout(Duration::from_secs(1))),
    ]);
    let orchestrator = orchestrator(provider.clone());

    let result = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert_eq!(result.provider_used, ProviderUsed::Generative);
    assert_eq!(provider.call_count(), 3);
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fall_back() {
    let failure = || {
        Err(SummaryError::ProviderServerError {
            status: 500,
            message: "boom".into(),
        })
    };
    let provider = ScriptedProvider::with_script(vec![failure(), failure(), failure()]);
    let orchestrator = orchestrator(provider.clone());

    let result = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert_eq!(result.provider_used, ProviderUsed::Fallback);
    assert_eq!(result.model, "textrank-extractive");
    assert!(result.token_usage.is_zero());
    assert!(!result.summary.is_empty());
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn client_error_falls_back_without_retry() {
    let provider = ScriptedProvider::with_script(vec![Err(SummaryError::ProviderClientError {
        status: 401,
        message: "invalid api key".into(),
    })]);
    let orchestrator = orchestrator(provider.clone());

    let result = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert!(result.is_fallback());
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn hanging_provider_is_bounded_by_attempt_timeouts() {
    let provider = Arc::new(HangingProvider {
        calls: AtomicU32::new(0),
    });
    let orchestrator = orchestrator(provider.clone());

    let started = tokio::time::Instant::now();
    let result = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert!(result.is_fallback());
    assert_eq!(provider.calls.load(Ordering::Relaxed), 3);
    // 3 attempts of 1s plus backoff of 10ms and 20ms
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn missing_provider_serves_extractive_summary() {
    let orchestrator = Abridge::builder().memory_store().build().unwrap();

    let result = orchestrator
        .summarize(
            "client",
            SummaryRequest::new("A. B. C. D.").max_output_tokens(10),
        )
        .await
        .unwrap();

    assert_eq!(result.summary, "A. B.");
    assert_eq!(result.provider_used, ProviderUsed::Fallback);
    assert_eq!(result.model, "textrank-extractive");
    assert_eq!(result.token_usage, TokenUsage::default());
}

#[tokio::test(start_paused = true)]
async fn fallback_results_are_cached() {
    let provider = ScriptedProvider::with_script(vec![Err(SummaryError::ProviderClientError {
        status: 400,
        message: "bad".into(),
    })]);
    let orchestrator = orchestrator(provider.clone());

    let first = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();
    let second = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();

    assert!(first.is_fallback());
    assert!(second.is_fallback());
    assert!(second.served_from_cache);
    assert_eq!(second.summary, first.summary);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn bullet_fallback_renders_list() {
    let orchestrator = Abridge::builder().build().unwrap();

    let result = orchestrator
        .summarize(
            "client",
            SummaryRequest::new(ARTICLE)
                .tone(Tone::Bullet)
                .max_output_tokens(200),
        )
        .await
        .unwrap();

    assert!(result.is_fallback());
    for line in result.summary.lines() {
        assert!(line.starts_with("- "), "line without bullet: {line}");
    }
}

// ============================================================================
// Validation and admission
// ============================================================================

#[tokio::test]
async fn invalid_requests_are_rejected_before_admission() {
    let orchestrator = Abridge::builder()
        .memory_store()
        .rate_limit(RateLimitConfig::new().requests(1))
        .limits(RequestLimits {
            max_text_length: 100,
            ..RequestLimits::default()
        })
        .build()
        .unwrap();

    let cases = [
        SummaryRequest::new("   \n\t "),
        SummaryRequest::new("x".repeat(101)),
        SummaryRequest::new("Fine text.").max_output_tokens(5),
        SummaryRequest::new("Fine text.").max_output_tokens(1001),
    ];
    for request in cases {
        let err = orchestrator.summarize("client", request).await.unwrap_err();
        assert!(matches!(err, SummaryError::Validation(_)), "got {err:?}");
    }

    // none of the invalid requests consumed the single admission
    assert!(
        orchestrator
            .summarize("client", SummaryRequest::new("Fine text."))
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn boundary_lengths_are_accepted() {
    let orchestrator = Abridge::builder()
        .limits(RequestLimits {
            max_text_length: 100,
            ..RequestLimits::default()
        })
        .build()
        .unwrap();

    let exact = SummaryRequest::new("y".repeat(100)).max_output_tokens(10);
    assert!(orchestrator.summarize("client", exact).await.is_ok());

    let ceiling = SummaryRequest::new("Text.").max_output_tokens(1000);
    assert!(orchestrator.summarize("client", ceiling).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn over_limit_callers_are_rejected() {
    let provider = ScriptedProvider::ok();
    let orchestrator = Abridge::builder()
        .provider(provider.clone())
        .retry(fast_retry())
        .memory_store()
        .rate_limit(
            RateLimitConfig::new()
                .requests(2)
                .window(Duration::from_secs(60)),
        )
        .build()
        .unwrap();

    for text in ["First text.", "Second text."] {
        assert!(
            orchestrator
                .summarize("client", SummaryRequest::new(text))
                .await
                .is_ok()
        );
    }

    let err = orchestrator
        .summarize("client", SummaryRequest::new("Third text."))
        .await
        .unwrap_err();
    assert!(matches!(err, SummaryError::RateLimited { limit: 2, .. }));
    assert_eq!(provider.call_count(), 2);

    // another identity is unaffected
    assert!(
        orchestrator
            .summarize("other", SummaryRequest::new("Third text."))
            .await
            .is_ok()
    );
}

#[tokio::test(start_paused = true)]
async fn cached_requests_still_count_toward_the_limit() {
    let orchestrator = Abridge::builder()
        .provider(ScriptedProvider::ok())
        .memory_store()
        .rate_limit(RateLimitConfig::new().requests(1))
        .build()
        .unwrap();

    orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap();
    let err = orchestrator
        .summarize("client", SummaryRequest::new(ARTICLE))
        .await
        .unwrap_err();
    assert!(matches!(err, SummaryError::RateLimited { .. }));
}

#[tokio::test(start_paused = true)]
async fn only_caller_visible_errors_escape() {
    let failures: Vec<Result<Generation>> = vec![
        Err(SummaryError::ProviderTimeout(Duration::from_secs(1))),
        Err(SummaryError::ProviderRateLimited { retry_after: None }),
        Err(SummaryError::ProviderClientError {
            status: 403,
            message: "forbidden".into(),
        }),
        Err(SummaryError::EmptyResponse),
        Err(SummaryError::ProviderUnavailable { attempts: 9 }),
        Ok(generation("Works fine after all.")),
    ];

    for failure in failures {
        let orchestrator = Abridge::builder()
            .provider(ScriptedProvider::with_script(vec![failure]))
            .retry(RetryConfig::disabled())
            .store(Arc::new(BrokenStore))
            .build()
            .unwrap();

        let outcome = orchestrator
            .summarize("client", SummaryRequest::new(ARTICLE))
            .await;
        match outcome {
            Ok(result) => assert!(!result.summary.is_empty()),
            Err(e) => assert!(e.is_caller_visible(), "leaked {e:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn broken_store_still_serves_requests() {
    let provider = ScriptedProvider::ok();
    let orchestrator = Abridge::builder()
        .provider(provider.clone())
        .store(Arc::new(BrokenStore))
        .rate_limit(RateLimitConfig::new().requests(1))
        .build()
        .unwrap();

    for _ in 0..3 {
        let result = orchestrator
            .summarize("client", SummaryRequest::new(ARTICLE))
            .await
            .unwrap();
        assert_eq!(result.provider_used, ProviderUsed::Generative);
        assert!(!result.served_from_cache);
    }
    // no cache, so every request reached the provider
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn configured_ttl_is_honored_by_builder() {
    let orchestrator = Abridge::builder()
        .memory_store()
        .response_cache(CacheConfig::new().ttl(Duration::from_millis(50)))
        .build()
        .unwrap();

    let request = SummaryRequest::new(ARTICLE);
    orchestrator.summarize("client", request.clone()).await.unwrap();
    assert!(
        orchestrator
            .summarize("client", request.clone())
            .await
            .unwrap()
            .served_from_cache
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        !orchestrator
            .summarize("client", request)
            .await
            .unwrap()
            .served_from_cache
    );
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_ok_when_everything_reachable() {
    let report = orchestrator(ScriptedProvider::ok()).health().await;

    assert_eq!(report.status, HealthStatus::Ok);
    assert_eq!(report.checks.generative, ComponentStatus::Ok);
    assert_eq!(report.checks.store, ComponentStatus::Ok);
    assert!(chrono::DateTime::parse_from_rfc3339(&report.timestamp).is_ok());
}

#[tokio::test]
async fn health_degraded_when_provider_down() {
    let report = orchestrator(ScriptedProvider::unreachable()).health().await;

    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.checks.generative, ComponentStatus::Error);
    assert_eq!(report.checks.store, ComponentStatus::Ok);
}

#[tokio::test]
async fn health_degraded_without_provider_and_store_disabled() {
    let report = Abridge::builder().build().unwrap().health().await;

    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.checks.generative, ComponentStatus::Error);
    assert_eq!(report.checks.store, ComponentStatus::Disabled);
}

#[tokio::test]
async fn health_error_when_both_down() {
    let report = Abridge::builder()
        .provider(ScriptedProvider::unreachable())
        .store(Arc::new(BrokenStore))
        .build()
        .unwrap()
        .health()
        .await;

    assert_eq!(report.status, HealthStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn health_probes_are_bounded_by_timeout() {
    let orchestrator = Abridge::builder()
        .provider(Arc::new(HangingProvider {
            calls: AtomicU32::new(0),
        }))
        .memory_store()
        .health_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let report = orchestrator.health().await;
    assert_eq!(report.checks.generative, ComponentStatus::Error);
    assert_eq!(report.status, HealthStatus::Degraded);
    assert!(report.latency_ms <= 250);
}
