//! Result-cache behavior: keys, TTL expiry, LRU capacity.

use std::time::Duration;

use serde_json::json;
use xhscrape::cache::ResultCache;

#[test]
fn keys_carry_the_platform_prefix() {
    assert_eq!(
        ResultCache::cache_key("https://xhslink.com/abc123"),
        "xhs:https://xhslink.com/abc123"
    );
}

#[tokio::test]
async fn fresh_entries_are_returned() {
    let cache = ResultCache::new(8, Duration::from_secs(3600));
    let body = json!({ "status": "success" });

    cache.insert("xhs:a".to_string(), body.clone()).await;

    assert_eq!(cache.get("xhs:a").await, Some(body));
    assert_eq!(cache.get("xhs:missing").await, None);
}

#[tokio::test]
async fn expired_entries_are_dropped_on_lookup() {
    let cache = ResultCache::new(8, Duration::from_millis(30));
    cache.insert("xhs:a".to_string(), json!(1)).await;

    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(cache.get("xhs:a").await, None);
    assert!(cache.is_empty().await, "expired entry should be evicted");
}

#[tokio::test]
async fn capacity_overflow_evicts_least_recently_used() {
    let cache = ResultCache::new(2, Duration::from_secs(3600));
    cache.insert("xhs:a".to_string(), json!("a")).await;
    cache.insert("xhs:b".to_string(), json!("b")).await;

    // Touch `a` so `b` becomes the eviction candidate.
    assert!(cache.get("xhs:a").await.is_some());
    cache.insert("xhs:c".to_string(), json!("c")).await;

    assert_eq!(cache.len().await, 2);
    assert!(cache.get("xhs:a").await.is_some());
    assert!(cache.get("xhs:b").await.is_none());
    assert!(cache.get("xhs:c").await.is_some());
}
