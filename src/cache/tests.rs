//! Tests for the resource cache

use super::*;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::time::{advance, Duration};

const KEY: &str = "https://data.example.gov/analytics.zip";

#[tokio::test(start_paused = true)]
async fn test_two_calls_within_ttl_fetch_once() {
    let mut cache: ResourceCache = ResourceCache::new(Duration::from_secs(3600));
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let first = cache
        .get_or_fetch(KEY, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"v1"))
        })
        .await
        .unwrap();

    advance(Duration::from_secs(3599)).await;

    let second = cache
        .get_or_fetch(KEY, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"v2"))
        })
        .await
        .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
    assert_eq!(second.as_ref(), b"v1");
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_refetched_and_replaced() {
    let mut cache: ResourceCache = ResourceCache::new(Duration::from_secs(3600));
    let counter = AtomicU32::new(0);
    let calls = &counter;

    cache
        .get_or_fetch(KEY, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"v1"))
        })
        .await
        .unwrap();

    // Age equal to the TTL is already stale
    advance(Duration::from_secs(3600)).await;
    assert!(!cache.contains_fresh(KEY));

    let second = cache
        .get_or_fetch(KEY, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from_static(b"v2"))
        })
        .await
        .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(second.as_ref(), b"v2");
    assert_eq!(cache.len(), 1);
    assert!(cache.contains_fresh(KEY));
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_leaves_entry_untouched() {
    let mut cache: ResourceCache<String> = ResourceCache::new(Duration::from_secs(10));

    cache
        .get_or_fetch(KEY, || async { Ok("old".to_string()) })
        .await
        .unwrap();
    advance(Duration::from_secs(11)).await;

    let err = cache
        .get_or_fetch(KEY, || async {
            Err::<String, _>(Error::http_status(503, "unavailable"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));

    // The stale entry survives; a later successful fetch replaces it
    assert_eq!(cache.len(), 1);
    assert!(!cache.contains_fresh(KEY));

    let value = cache
        .get_or_fetch(KEY, || async { Ok("new".to_string()) })
        .await
        .unwrap();
    assert_eq!(value, "new");
}

#[tokio::test(start_paused = true)]
async fn test_fetch_timeout_aborts_without_storing() {
    let mut cache: ResourceCache<String> = ResourceCache::new(Duration::from_secs(60));

    let result: Result<String> = cache
        .get_or_fetch_with_timeout(KEY, Duration::from_millis(200), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        })
        .await;

    assert!(matches!(result, Err(Error::Timeout { timeout_ms: 200 })));
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fetch_within_timeout_is_cached() {
    let mut cache: ResourceCache<String> = ResourceCache::new(Duration::from_secs(60));

    let value = cache
        .get_or_fetch_with_timeout(KEY, Duration::from_secs(1), || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok("payload".to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, "payload");
    assert!(cache.contains_fresh(KEY));
}

#[tokio::test]
async fn test_keys_are_independent_and_invalidate() {
    let mut cache: ResourceCache<u32> = ResourceCache::default();
    assert_eq!(cache.ttl(), DEFAULT_TTL);

    cache.get_or_fetch("a", || async { Ok(1) }).await.unwrap();
    cache.get_or_fetch("b", || async { Ok(2) }).await.unwrap();
    assert_eq!(cache.len(), 2);

    assert!(cache.invalidate("a"));
    assert!(!cache.invalidate("a"));
    assert!(!cache.contains_fresh("a"));
    assert!(cache.contains_fresh("b"));

    let refetched = cache.get_or_fetch("a", || async { Ok(10) }).await.unwrap();
    assert_eq!(refetched, 10);
}

#[test]
fn test_cache_entry_freshness() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap();

    rt.block_on(async {
        let entry = CacheEntry::new(());
        assert!(entry.is_fresh(Duration::from_secs(1)));
        advance(Duration::from_secs(1)).await;
        assert!(!entry.is_fresh(Duration::from_secs(1)));
        assert_eq!(entry.age(), Duration::from_secs(1));
    });
}
