//! SiteCache: path-keyed resource cache for the static-file server

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::lru::{LruCache, PutResult};
use crate::stats::CacheStats;

/// One cached resource: content bytes plus the MIME type they are served with.
///
/// Resources are immutable once cached. `content_length` is always the exact
/// byte length of `content`, by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    content_type: String,
    content: Vec<u8>,
}

impl Resource {
    /// MIME type, e.g. `text/html`
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The resource body
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Byte length of the body
    pub fn content_length(&self) -> usize {
        self.content.len()
    }
}

/// What [`SiteCache::put`] did with the key.
///
/// `put` is an upsert: re-putting a cached path replaces its resource and
/// refreshes its recency instead of creating a second entry. Duplicate keys
/// are never rejected and can never orphan an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The path was not cached before
    Inserted,
    /// The path was cached; its resource was replaced
    Replaced,
}

/// Bounded LRU cache mapping request paths to loaded resources.
///
/// Lookups and inserts mutate the recency list as well as the index, so the
/// whole structure sits behind one mutex; a `SiteCache` can be shared across
/// connection tasks as-is. Hits hand out `Arc<Resource>` views that stay
/// valid after the entry itself is evicted.
pub struct SiteCache {
    inner: Mutex<LruCache<String, Arc<Resource>>>,
    stats: CacheStats,
    capacity: usize,
}

impl SiteCache {
    /// Create a cache holding at most `capacity` resources.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_index_capacity(capacity, 0)
    }

    /// Like [`new`](Self::new), with an explicit pre-size for the path index.
    /// A hint of zero selects the default.
    pub fn with_index_capacity(capacity: usize, index_hint: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        Ok(Self {
            inner: Mutex::new(LruCache::with_index_capacity(capacity, index_hint)),
            stats: CacheStats::new(),
            capacity,
        })
    }

    /// Cache `content` under `path`, evicting the least-recently-used
    /// resource if the cache is full.
    ///
    /// The cache stores its own copies of all three arguments. After the call
    /// the path is the most-recently-used entry.
    ///
    /// # Errors
    /// Returns [`Error::EmptyKey`] when `path` is empty.
    pub fn put(&self, path: &str, content_type: &str, content: &[u8]) -> Result<PutOutcome> {
        if path.is_empty() {
            return Err(Error::EmptyKey);
        }

        let resource = Arc::new(Resource {
            content_type: content_type.to_owned(),
            content: content.to_vec(),
        });

        let mut inner = self.inner.lock();
        match inner.put(path.to_owned(), resource) {
            PutResult::Inserted => {
                self.stats.record_insert();
                Ok(PutOutcome::Inserted)
            }
            PutResult::InsertedEvicting(..) => {
                self.stats.record_insert();
                self.stats.record_eviction();
                Ok(PutOutcome::Inserted)
            }
            PutResult::Replaced(_) => Ok(PutOutcome::Replaced),
        }
    }

    /// Look up `path`, promoting it to most-recently-used on a hit.
    ///
    /// A miss has no side effect beyond the miss counter.
    pub fn get(&self, path: &str) -> Option<Arc<Resource>> {
        let mut inner = self.inner.lock();
        match inner.get(path) {
            Some(resource) => {
                let view = Arc::clone(resource);
                drop(inner);
                self.stats.record_hit();
                Some(view)
            }
            None => {
                drop(inner);
                self.stats.record_miss();
                None
            }
        }
    }

    /// Current number of cached resources
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds no resources
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Maximum number of cached resources
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached paths in recency order, most-recently-used first
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    /// Hit/miss counters
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drop every cached resource and zero the counters
    pub fn clear(&self) {
        self.inner.lock().clear();
        self.stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert_eq!(SiteCache::new(0).err(), Some(Error::InvalidCapacity(0)));
        assert!(SiteCache::new(1).is_ok());
    }

    #[test]
    fn rejects_empty_path() {
        let cache = SiteCache::new(2).unwrap();
        assert_eq!(
            cache.put("", "text/plain", b"x").err(),
            Some(Error::EmptyKey)
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn round_trips_content() {
        let cache = SiteCache::new(2).unwrap();

        cache.put("/a", "text/plain", b"AAA").unwrap();
        cache.put("/b", "text/plain", b"BB").unwrap();

        let a = cache.get("/a").expect("hit");
        assert_eq!(a.content(), b"AAA");
        assert_eq!(a.content_length(), 3);
        assert_eq!(a.content_type(), "text/plain");
        assert_eq!(cache.keys(), vec!["/a", "/b"]);
    }

    #[test]
    fn evicts_untouched_entry_first() {
        let cache = SiteCache::new(2).unwrap();

        cache.put("/a", "text/plain", b"AAA").unwrap();
        cache.put("/b", "text/plain", b"BB").unwrap();
        cache.get("/a"); // refresh /a, leaving /b least recently used

        cache.put("/c", "text/plain", b"C").unwrap();

        assert_eq!(cache.get("/b"), None);
        assert!(cache.get("/a").is_some());
        assert!(cache.get("/c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn capacity_one_keeps_newest() {
        let cache = SiteCache::new(1).unwrap();

        cache.put("/x", "text/plain", b"x").unwrap();
        cache.put("/y", "text/plain", b"y").unwrap();

        assert_eq!(cache.get("/x"), None);
        assert!(cache.get("/y").is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn repeated_get_never_evicts() {
        let cache = SiteCache::new(1).unwrap();
        cache.put("/only", "text/plain", b"solo").unwrap();

        for _ in 0..20 {
            assert!(cache.get("/only").is_some());
            assert_eq!(cache.len(), 1);
        }
    }

    #[test]
    fn miss_leaves_cache_untouched() {
        let cache = SiteCache::new(2).unwrap();
        cache.put("/a", "text/plain", b"AAA").unwrap();

        assert_eq!(cache.get("/never"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().misses(), 1);
    }

    #[test]
    fn reput_replaces_instead_of_duplicating() {
        let cache = SiteCache::new(2).unwrap();

        assert_eq!(
            cache.put("/a", "text/plain", b"old").unwrap(),
            PutOutcome::Inserted
        );
        assert_eq!(
            cache.put("/a", "text/html", b"new").unwrap(),
            PutOutcome::Replaced
        );

        assert_eq!(cache.len(), 1);
        let a = cache.get("/a").unwrap();
        assert_eq!(a.content(), b"new");
        assert_eq!(a.content_type(), "text/html");
    }

    #[test]
    fn view_survives_eviction() {
        let cache = SiteCache::new(1).unwrap();
        cache.put("/a", "text/plain", b"AAA").unwrap();

        let view = cache.get("/a").unwrap();
        cache.put("/b", "text/plain", b"BB").unwrap(); // evicts /a

        assert_eq!(cache.get("/a"), None);
        assert_eq!(view.content(), b"AAA");
    }

    #[test]
    fn capacity_never_exceeded() {
        let cache = SiteCache::new(3).unwrap();

        for i in 0..50 {
            cache
                .put(&format!("/f{}", i), "text/plain", b"data")
                .unwrap();
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.stats().evictions(), 47);
    }

    #[test]
    fn stats_track_hits_and_evictions() {
        let cache = SiteCache::new(2).unwrap();

        cache.put("/a", "text/plain", b"a").unwrap();
        cache.put("/b", "text/plain", b"b").unwrap();
        cache.get("/a");
        cache.get("/a");
        cache.get("/missing");
        cache.put("/c", "text/plain", b"c").unwrap();

        let snap = cache.stats().snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.inserts, 3);
        assert_eq!(snap.evictions, 1);
        assert_eq!(snap.hit_ratio(), 2.0 / 3.0);
    }

    #[test]
    fn clear_drops_entries_and_counters() {
        let cache = SiteCache::new(4).unwrap();

        cache.put("/a", "text/plain", b"a").unwrap();
        cache.put("/b", "text/plain", b"b").unwrap();
        cache.get("/a");

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits(), 0);
        assert_eq!(cache.get("/a"), None);
    }
}
