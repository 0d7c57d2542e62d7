// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicU32, Ordering};

fn cache(ttl_seconds: u64, max_entries: usize) -> TtlCache<String> {
    TtlCache::new(CacheNamespaceConfig {
        ttl_seconds,
        max_entries,
    })
}

#[tokio::test]
async fn get_returns_what_set_published() {
    let cache = cache(10, 8);
    assert_eq!(cache.get("a"), None);
    cache.set("a", "one".into());
    assert_eq!(cache.get("a"), Some("one".into()));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl() {
    let cache = cache(10, 8);
    cache.set("a", "one".into());

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(cache.get("a"), Some("one".into()));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get("a"), None);
}

#[tokio::test]
async fn lru_eviction_at_capacity() {
    let cache = cache(60, 2);
    cache.set("a", "1".into());
    cache.set("b", "2".into());

    // Touch "a" so "b" is the least recently used.
    cache.get("a");
    cache.set("c", "3".into());

    assert_eq!(cache.get("a"), Some("1".into()));
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("c"), Some("3".into()));
    assert_eq!(cache.stats().evictions, 1);
}

#[tokio::test]
async fn get_or_compute_fills_and_reuses() {
    let cache = cache(60, 8);
    let runs = AtomicU32::new(0);

    for _ in 0..3 {
        let value: Result<String, &str> = cache
            .get_or_compute("k", || async {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok("computed".into())
            })
            .await;
        assert_eq!(value.unwrap(), "computed");
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_or_compute_propagates_producer_error_without_caching() {
    let cache = cache(60, 8);
    let failed: Result<String, &str> = cache.get_or_compute("k", || async { Err("boom") }).await;
    assert_eq!(failed, Err("boom"));

    // A later producer still runs (the failure was not cached).
    let ok: Result<String, &str> = cache.get_or_compute("k", || async { Ok("v".into()) }).await;
    assert_eq!(ok.unwrap(), "v");
}

#[tokio::test]
async fn single_flight_coalesces_concurrent_producers() {
    let cache = Arc::new(cache(60, 8));
    let runs = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let runs = Arc::clone(&runs);
        handles.push(tokio::spawn(async move {
            let value: Result<String, &str> = cache
                .get_or_compute("k", || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    // Hold the flight long enough for every caller to queue.
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok("shared".into())
                })
                .await;
            value.unwrap()
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap(), "shared");
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn layered_cache_uses_configured_ttls() {
    let layered = LayeredCache::new(&muster_core::config::CacheConfig::default());
    layered.config.set("x", serde_json::json!({"k": 1}));
    assert!(layered.config.get("x").is_some());

    let stats = layered.stats();
    assert_eq!(stats.config.entries, 1);
    assert_eq!(stats.pane_content.entries, 0);
}
