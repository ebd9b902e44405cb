//! Result cache with TTL and LRU eviction
//!
//! Keyed by `"xhs:" + short_url`, storing the full success response body.
//! Entries expire after a fixed time-to-live; capacity overflow evicts the
//! least recently used entry. Lookups precede the scrape pipeline and cache
//! behavior is never fatal to a request.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::utils::constants::CACHE_KEY_PREFIX;

struct CacheEntry {
    body: serde_json::Value,
    stored_at: Instant,
}

pub struct ResultCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache holding at most `capacity` entries, each valid for
    /// `ttl` after insertion.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Cache key for a short URL.
    #[must_use]
    pub fn cache_key(short_url: &str) -> String {
        format!("{CACHE_KEY_PREFIX}{short_url}")
    }

    /// Look up a fresh entry. Expired entries are removed on the way out.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!(%key, "result cache hit");
                Some(entry.body.clone())
            }
            Some(_) => {
                debug!(%key, "result cache entry expired");
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    /// Store a success body under `key`, stamping it with the current time.
    pub async fn insert(&self, key: String, body: serde_json::Value) {
        let mut entries = self.entries.lock().await;
        debug!(%key, "caching scrape result");
        entries.put(
            key,
            CacheEntry {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when no entries are held.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
