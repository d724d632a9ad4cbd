use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use abridge::{KeyValueStore, MemoryStore};

#[tokio::test]
async fn values_round_trip_until_ttl() {
    let store = MemoryStore::new();
    store
        .set_with_ttl("k", "v".into(), Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn overwrite_resets_ttl() {
    let store = MemoryStore::new();
    store
        .set_with_ttl("k", "old".into(), Duration::from_millis(50))
        .await
        .unwrap();
    store
        .set_with_ttl("k", "new".into(), Duration::from_secs(60))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("new"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_increments_are_atomic() {
    let store = Arc::new(MemoryStore::new());
    let window = Duration::from_secs(60);

    let handles: Vec<_> = (0..200)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.increment_in_window("hot", window).await.unwrap() })
        })
        .collect();

    let mut seen = BTreeSet::new();
    for handle in handles {
        seen.insert(handle.await.unwrap());
    }

    // every caller observed a distinct post-increment count
    assert_eq!(seen.len(), 200);
    assert_eq!(seen.first(), Some(&1));
    assert_eq!(seen.last(), Some(&200));
    assert_eq!(store.window("hot").map(|w| w.count), Some(200));
}

#[tokio::test]
async fn ping_always_succeeds() {
    let store = MemoryStore::default();
    assert!(store.ping().await.is_ok());
    assert_eq!(store.name(), "memory");
}
