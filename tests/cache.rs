//! End-to-end cache scenarios (spec §8: cache TTL, single-flight).

use aegis_cache::memory::{byte_len_size_fn, MemoryBackend};
use aegis_cache::{Cache, CacheConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn cache() -> Cache {
    let backend = MemoryBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(60));
    Cache::new(backend, CacheConfig::builder().build())
}

#[tokio::test]
async fn ttl_expiry_matches_the_documented_timeline() {
    let cache = cache();

    cache.set("greeting", &"hello", Some(Duration::from_millis(200))).await.unwrap();
    let value: Option<String> = cache.get("greeting").await.unwrap();
    assert_eq!(value.as_deref(), Some("hello"));

    tokio::time::sleep(Duration::from_millis(350)).await;

    let expired: Option<String> = cache.get("greeting").await.unwrap();
    assert_eq!(expired, None);
    assert_eq!(cache.ttl("greeting").await.unwrap(), -2);
}

#[tokio::test]
async fn namespaces_do_not_leak_into_each_other() {
    let backend = MemoryBackend::new(1000, None, byte_len_size_fn, Duration::from_secs(60));
    let cache = Cache::new(backend, CacheConfig::builder().build());

    let tenant_a = cache.namespace("tenant-a");
    let tenant_b = cache.namespace("tenant-b");

    tenant_a.set("config", &"a-value", None).await.unwrap();

    let leaked: Option<String> = tenant_b.get("config").await.unwrap();
    assert_eq!(leaked, None);

    let own: Option<String> = tenant_a.get("config").await.unwrap();
    assert_eq!(own.as_deref(), Some("a-value"));
}

#[tokio::test]
async fn concurrent_get_or_set_calls_invoke_the_factory_once() {
    let cache = Arc::new(cache());
    let invocations = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let invocations = Arc::clone(&invocations);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_set::<u64, _, _>(
                    "k",
                    || {
                        let invocations = Arc::clone(&invocations);
                        async move {
                            invocations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(100)).await;
                            Ok(42)
                        }
                    },
                    Some(Duration::from_secs(60)),
                )
                .await
                .unwrap()
        }));
    }

    let results: Vec<u64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert!(results.iter().all(|&v| v == 42));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);

    let cached: Option<u64> = cache.get("k").await.unwrap();
    assert_eq!(cached, Some(42));
}
