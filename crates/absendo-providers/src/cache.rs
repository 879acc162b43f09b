//! Calendar document cache with TTL support.
//!
//! Entries are keyed by the original source identifier. Expired entries
//! stay in the cache: the gateway falls back to them when a refresh fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::document::RawCalendarDocument;

/// A cached calendar document with its fetch time.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The parsed calendar.
    pub document: Arc<RawCalendarDocument>,
    /// When the document was fetched (wall clock).
    pub fetched_at_utc: DateTime<Utc>,
    /// When the document was fetched (monotonic clock).
    fetched_at: Instant,
}

impl CacheEntry {
    /// Creates an entry fetched now.
    pub fn new(document: Arc<RawCalendarDocument>) -> Self {
        Self {
            document,
            fetched_at_utc: Utc::now(),
            fetched_at: Instant::now(),
        }
    }

    /// Returns how long ago the document was fetched.
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    /// Returns true if the entry is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Calendar documents keyed by source identifier.
#[derive(Debug)]
pub struct DocumentCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl DocumentCache {
    /// Creates an empty cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Gets an entry by key, fresh or stale.
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Gets an entry by key, only if still fresh.
    pub fn get_fresh(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|entry| entry.is_fresh(self.ttl))
    }

    /// Stores a document fetched now, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, document: Arc<RawCalendarDocument>) {
        let key = key.into();
        let replaced = self
            .entries
            .insert(key.clone(), CacheEntry::new(document))
            .is_some();
        debug!(key = %key, replaced = replaced, "Stored calendar in cache");
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key);
        if entry.is_some() {
            debug!(key = %key, "Removed cache entry");
        }
        entry
    }

    /// Clears all entries.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        debug!(count = count, "Cleared all cache entries");
    }

    /// Removes all stale entries, returning how many were dropped.
    pub fn evict_expired(&mut self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|key, entry| {
            let keep = entry.is_fresh(ttl);
            if !keep {
                trace!(key = %key, "Evicting expired cache entry");
            }
            keep
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted = evicted, "Evicted expired cache entries");
        }
        evicted
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(15 * 60);

    fn doc() -> Arc<RawCalendarDocument> {
        Arc::new(RawCalendarDocument::default())
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_until_ttl() {
        let mut cache = DocumentCache::new(TTL);
        cache.insert("cal", doc());
        assert!(cache.get_fresh("cal").is_some());

        tokio::time::advance(Duration::from_secs(14 * 60)).await;
        assert!(cache.get_fresh("cal").is_some());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.get_fresh("cal").is_none());
        assert!(cache.get("cal").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn insert_replaces_and_resets_age() {
        let mut cache = DocumentCache::new(TTL);
        cache.insert("cal", doc());
        tokio::time::advance(Duration::from_secs(20 * 60)).await;
        assert!(cache.get_fresh("cal").is_none());

        cache.insert("cal", doc());
        assert_eq!(cache.len(), 1);
        assert!(cache.get_fresh("cal").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn evict_expired_keeps_fresh() {
        let mut cache = DocumentCache::new(TTL);
        cache.insert("old", doc());
        tokio::time::advance(Duration::from_secs(10 * 60)).await;
        cache.insert("new", doc());
        tokio::time::advance(Duration::from_secs(6 * 60)).await;

        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let mut cache = DocumentCache::new(TTL);
        cache.insert("a", doc());
        cache.insert("b", doc());

        assert!(cache.remove("a").is_some());
        assert!(cache.remove("a").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
