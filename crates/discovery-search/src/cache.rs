//! Bounded loading caches.
//!
//! ## LRU Eviction
//!
//! Entries live in an `IndexMap` ordered by recency: a hit moves the entry
//! to the back, and inserting past capacity evicts from the front.
//!
//! ## Loading
//!
//! [`LoadingCache::get_or_load`] is the only way values enter the cache.
//! Misses go through a [`CoalesceMap`], so concurrent misses on one key run
//! the loader once. Failed and cancelled loads are never cached.
//!
//! ## Metrics
//!
//! Lock-free atomic counters track hits, misses, loads and evictions.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indexmap::IndexMap;
use serde::Serialize;

use crate::coalesce::CoalesceMap;
use crate::context::SearchContext;
use crate::error::DiscoveryResult;

/// Snapshot of one cache's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Loader runs that produced a value.
    pub loads: u64,
    pub evictions: u64,
    /// Misses satisfied by another thread's in-flight load.
    pub joined: u64,
    pub entries: usize,
}

impl CacheMetricsSnapshot {
    /// Hit rate (0.0–1.0). Returns 0.0 if no lookups yet.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct LoadingCache<K, V> {
    name: &'static str,
    capacity: usize,
    entries: Mutex<IndexMap<K, V>>,
    inflight: CoalesceMap<K, V>,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> LoadingCache<K, V>
where
    K: Hash + Eq + Clone + std::fmt::Debug,
    V: Clone,
{
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(name: &'static str, capacity: usize, join_poll_interval: Duration) -> Self {
        Self {
            name,
            capacity: capacity.max(1),
            entries: Mutex::new(IndexMap::new()),
            inflight: CoalesceMap::new(join_poll_interval),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached value for `key`, marking it most recently used. Does not
    /// count towards hit/miss metrics.
    #[must_use]
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = map.get_index_of(key)?;
        let last = map.len() - 1;
        map.move_index(idx, last);
        map.get_index(last).map(|(_, v)| v.clone())
    }

    /// Return the cached value for `key`, or run `load` to produce it.
    ///
    /// Concurrent callers missing on the same key share one `load` run.
    pub fn get_or_load<F>(&self, key: &K, context: &SearchContext, load: F) -> DiscoveryResult<V>
    where
        F: FnOnce(&SearchContext) -> DiscoveryResult<V>,
    {
        context.check(self.name)?;
        if let Some(value) = self.get_if_present(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache = self.name, ?key, "cache hit");
            return Ok(value);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache = self.name, ?key, "cache miss");

        let outcome = self.inflight.execute_or_join(key.clone(), context, |ctx| {
            // A leader that finished just before we registered has already
            // filled the entry.
            if let Some(value) = self.get_if_present(key) {
                return Ok(value);
            }
            let value = load(ctx)?;
            self.insert(key.clone(), value.clone());
            self.loads.fetch_add(1, Ordering::Relaxed);
            Ok(value)
        })?;
        Ok(outcome.into_inner())
    }

    fn insert(&self, key: K, value: V) {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        map.shift_remove(&key);
        while map.len() >= self.capacity {
            if let Some((evicted, _)) = map.shift_remove_index(0) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache = self.name, key = ?evicted, "cache eviction");
            }
        }
        map.insert(key, value);
    }

    pub fn invalidate(&self, key: &K) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(key);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn metrics(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            joined: self.inflight.metrics().joined_count,
            entries: self.len(),
        }
    }
}

impl<K, V> std::fmt::Debug for LoadingCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadingCache")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn cache(capacity: usize) -> LoadingCache<String, u32> {
        LoadingCache::new("test", capacity, Duration::from_millis(5))
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let cache = cache(4);
        let ctx = SearchContext::new();
        let loads = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache
                .get_or_load(&"a".to_string(), &ctx, |_| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(5)
                })
                .unwrap();
            assert_eq!(v, 5);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        let m = cache.metrics();
        assert_eq!((m.hits, m.misses, m.loads), (2, 1, 1));
        assert!((m.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = cache(2);
        let ctx = SearchContext::new();
        cache.get_or_load(&"a".into(), &ctx, |_| Ok(1)).unwrap();
        cache.get_or_load(&"b".into(), &ctx, |_| Ok(2)).unwrap();
        // touch "a" so "b" becomes the oldest
        cache.get_or_load(&"a".into(), &ctx, |_| Ok(99)).unwrap();
        cache.get_or_load(&"c".into(), &ctx, |_| Ok(3)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_if_present(&"a".into()), Some(1));
        assert_eq!(cache.get_if_present(&"b".into()), None);
        assert_eq!(cache.metrics().evictions, 1);
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let cache = cache(2);
        let ctx = SearchContext::new();
        let err = cache
            .get_or_load(&"a".into(), &ctx, |_| Err(DiscoveryError::invalid_filters("x")))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTERS");
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_load(&"a".into(), &ctx, |_| Ok(8)).unwrap(), 8);
    }

    #[test]
    fn cancelled_context_never_loads() {
        let cache = cache(2);
        let ctx = SearchContext::new();
        ctx.cancel();
        let err = cache
            .get_or_load(&"a".into(), &ctx, |_| panic!("must not load"))
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn clear_and_invalidate_drop_entries() {
        let cache = cache(4);
        let ctx = SearchContext::new();
        cache.get_or_load(&"a".into(), &ctx, |_| Ok(1)).unwrap();
        cache.get_or_load(&"b".into(), &ctx, |_| Ok(2)).unwrap();
        cache.invalidate(&"a".into());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    #[allow(clippy::needless_collect)]
    fn concurrent_misses_load_once() {
        let cache = Arc::new(cache(4));
        let loads = Arc::new(AtomicUsize::new(0));
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get_or_load(&"shared".into(), &SearchContext::new(), |_| {
                            loads.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(100));
                            Ok(42)
                        })
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }
}
