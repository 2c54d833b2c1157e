use crate::error::Result;
use crate::query::QueryNode;
use crate::types::{SearchOptions, SearchPage};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    generation: u64,
    inserted_at: Instant,
    page: Arc<SearchPage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
    pub generation: u64,
    pub hits: u64,
    pub misses: u64,
}

/// TTL-bounded memo of search pages, keyed by the canonical query rendering.
///
/// Every entry is tagged with the generation current when its computation
/// started. [`QueryCache::invalidate_all`] bumps the generation, so a result
/// computed against pre-write data is never served after the write, even if
/// it lands in the map after the clear.
pub struct QueryCache {
    entries: DashMap<String, Arc<CacheEntry>>,
    ttl: Duration,
    capacity: usize,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(120);
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(ttl: Duration, capacity: usize) -> Self {
        QueryCache {
            entries: DashMap::new(),
            ttl,
            capacity,
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cache key for one page of one query.
    pub fn key(node: &QueryNode, page: usize, page_size: usize, options: SearchOptions) -> String {
        format!(
            "{}|page={}|size={}|cs={}",
            node, page, page_size, options.case_sensitive
        )
    }

    pub fn get(&self, key: &str) -> Option<Arc<SearchPage>> {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        if self.is_live(&entry) {
            return Some(Arc::clone(&entry.page));
        }
        self.entries
            .remove_if(key, |_, current| Arc::ptr_eq(current, &entry));
        None
    }

    /// Serve `key` from the cache, or run `compute` and remember its result.
    /// Errors pass through and are never stored.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> Result<Arc<SearchPage>>
    where
        F: FnOnce() -> Result<SearchPage>,
    {
        if let Some(page) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("[QUERY_CACHE] HIT {}", key);
            return Ok(page);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("[QUERY_CACHE] MISS {}", key);

        let generation = self.generation.load(Ordering::Acquire);
        let page = Arc::new(compute()?);
        self.insert(key, generation, Arc::clone(&page));
        Ok(page)
    }

    fn insert(&self, key: &str, generation: u64, page: Arc<SearchPage>) {
        if self.capacity == 0 {
            return;
        }
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("[QUERY_CACHE] SKIP {} (invalidated during compute)", key);
            return;
        }

        if self.entries.len() >= self.capacity && !self.entries.contains_key(key) {
            let now = Instant::now();
            let current = self.generation.load(Ordering::Acquire);
            self.entries.retain(|_, e| {
                e.generation == current && now.duration_since(e.inserted_at) < self.ttl
            });
            if self.entries.len() >= self.capacity {
                // The iterator holds a shard read lock; release it before removing.
                let victim = self.entries.iter().next().map(|e| e.key().clone());
                if let Some(evict_key) = victim {
                    self.entries.remove(&evict_key);
                    tracing::debug!("[QUERY_CACHE] EVICT {}", evict_key);
                }
            }
        }

        self.entries.insert(
            key.to_string(),
            Arc::new(CacheEntry {
                generation,
                inserted_at: Instant::now(),
                page,
            }),
        );
    }

    /// Drop every entry. Called after each successful write.
    pub fn invalidate_all(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.clear();
        tracing::debug!("[QUERY_CACHE] INVALIDATE generation={}", generation);
    }

    fn is_live(&self, entry: &CacheEntry) -> bool {
        entry.generation == self.generation.load(Ordering::Acquire)
            && entry.inserted_at.elapsed() < self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl.as_secs(),
            generation: self.generation.load(Ordering::Acquire),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        QueryCache::new(Self::DEFAULT_TTL, Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiTrackError;

    fn page(total: usize) -> SearchPage {
        SearchPage {
            rows: Vec::new(),
            total,
            total_pages: 0,
            page: 1,
            page_size: 10,
            truncated: false,
        }
    }

    #[test]
    fn hit_after_miss() {
        let cache = QueryCache::default();
        let first = cache.get_or_compute("k", || Ok(page(1))).unwrap();
        let second = cache
            .get_or_compute("k", || panic!("should be cached"))
            .unwrap();
        assert_eq!(first.total, second.total);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = QueryCache::default();
        let err = cache.get_or_compute("k", || Err(ApiTrackError::Store("down".into())));
        assert!(err.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_compute("k", || Ok(page(2))).unwrap().total, 2);
    }

    #[test]
    fn ttl_expiry() {
        let cache = QueryCache::new(Duration::from_millis(20), 10);
        cache.get_or_compute("k", || Ok(page(1))).unwrap();
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("k").is_none());
        assert_eq!(cache.get_or_compute("k", || Ok(page(5))).unwrap().total, 5);
    }

    #[test]
    fn invalidate_clears_and_bumps_generation() {
        let cache = QueryCache::default();
        cache.get_or_compute("k", || Ok(page(1))).unwrap();
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().generation, 1);
    }

    #[test]
    fn compute_racing_invalidation_is_not_stored() {
        let cache = QueryCache::default();
        let result = cache
            .get_or_compute("k", || {
                cache.invalidate_all();
                Ok(page(1))
            })
            .unwrap();
        assert_eq!(result.total, 1);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn capacity_is_bounded() {
        let cache = QueryCache::new(Duration::from_secs(60), 3);
        for i in 0..10 {
            let key = format!("k{}", i);
            cache.get_or_compute(&key, || Ok(page(i))).unwrap();
        }
        assert_eq!(cache.len(), 3);
        assert!(cache.get("k9").is_some());
    }

    #[test]
    fn zero_capacity_disables_storage() {
        let cache = QueryCache::new(Duration::from_secs(60), 0);
        cache.get_or_compute("k", || Ok(page(1))).unwrap();
        assert!(cache.is_empty());
    }
}
