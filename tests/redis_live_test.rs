//! Live Redis tests - ignored by default, run with:
//! `REDIS_URL=redis://127.0.0.1:6379/15 cargo test --test redis_live_test -- --ignored`

#![cfg(feature = "redis")]

use std::sync::Arc;
use std::time::Duration;

use abridge::{
    AdmissionLimiter, CacheConfig, Fingerprint, KeyValueStore, ProviderUsed, RateLimitConfig,
    RedisStore, ResponseCache, SummaryRequest, SummaryResult, TokenUsage,
};

fn store() -> RedisStore {
    let url = std::env::var("REDIS_URL").expect("REDIS_URL must be set for live tests");
    RedisStore::new(&url)
        .expect("valid redis url")
        .op_timeout(Duration::from_secs(2))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", std::process::id())
}

#[tokio::test]
#[ignore]
async fn test_live_redis_ping_and_values() {
    let store = store();
    store.ping().await.expect("ping failed");

    let key = unique("abridge-test-value");
    store
        .set_with_ttl(&key, "hello".into(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("hello"));
}

#[tokio::test]
#[ignore]
async fn test_live_redis_window_expires() {
    let store = store();
    let key = unique("abridge-test-window");
    let window = Duration::from_millis(1_200);

    assert_eq!(store.increment_in_window(&key, window).await.unwrap(), 1);
    assert_eq!(store.increment_in_window(&key, window).await.unwrap(), 2);

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(store.increment_in_window(&key, window).await.unwrap(), 1);
}

#[tokio::test]
#[ignore]
async fn test_live_redis_cache_and_limiter() {
    let store: Arc<dyn KeyValueStore> = Arc::new(store());

    let cache = ResponseCache::new(Some(store.clone()), &CacheConfig::default());
    let fp = Fingerprint::of(&SummaryRequest::new(unique("live cache text")));
    let result = SummaryResult {
        summary: "Cached through redis.".into(),
        provider_used: ProviderUsed::Generative,
        token_usage: TokenUsage::new(1, 2),
        model: "live".into(),
        latency_ms: 5,
        served_from_cache: false,
    };
    cache.put(&fp, &result).await;
    assert!(cache.get(&fp).await.unwrap().served_from_cache);

    let limiter = AdmissionLimiter::new(
        Some(store),
        RateLimitConfig::new()
            .requests(1)
            .window(Duration::from_secs(5)),
    );
    let identity = unique("live-identity");
    assert!(limiter.allow(&identity).await);
    assert!(!limiter.allow(&identity).await);
}
