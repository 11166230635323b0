//! Bounded, TTL-aware in-memory cache.
//!
//! Backed by moka with an LRU eviction policy. Capacity is enforced on every insert
//! (pending maintenance runs inline), and expiry is evaluated lazily when an entry is read.

use std::sync::Arc;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;

use super::types::CacheConfig;
use crate::keys::CacheKey;

/// Key → value cache with a fixed item budget and a per-instance time-to-live.
///
/// A zero TTL makes every entry stale on arrival: inserts are dropped and lookups miss.
pub struct BoundedTtlCache<V> {
    entries: Cache<CacheKey, V>,
    config: CacheConfig,
}

impl<V> BoundedTtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache from its capacity/TTL settings.
    pub fn new(config: CacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_items.max(1))
            .eviction_policy(EvictionPolicy::lru());

        if !config.ttl.is_zero() {
            builder = builder.time_to_live(config.ttl);
        }

        Self {
            entries: builder.build(),
            config,
        }
    }

    /// Returns the cached value, or `None` when absent or expired.
    #[inline]
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        if self.config.ttl.is_zero() {
            return None;
        }
        self.entries.get(key)
    }

    /// Inserts or overwrites `key`, evicting the least-recently-used entry if over budget.
    #[inline]
    pub fn put(&self, key: CacheKey, value: V) {
        if self.config.ttl.is_zero() {
            return;
        }
        self.entries.insert(key, value);
        self.entries.run_pending_tasks();
    }

    /// Returns `true` if a live entry exists for `key`.
    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries currently held (may include entries that expired but were not
    /// yet reclaimed).
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    pub fn max_items(&self) -> u64 {
        self.config.max_items
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }
}

impl<V> std::fmt::Debug for BoundedTtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTtlCache")
            .field("entries", &self.entries.entry_count())
            .field("max_items", &self.config.max_items)
            .field("ttl", &self.config.ttl)
            .finish()
    }
}

/// Shared handle to a [`BoundedTtlCache`].
pub struct BoundedTtlCacheHandle<V> {
    inner: Arc<BoundedTtlCache<V>>,
}

impl<V> Clone for BoundedTtlCacheHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> BoundedTtlCacheHandle<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(BoundedTtlCache::new(config)),
        }
    }

    #[inline]
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.get(key)
    }

    #[inline]
    pub fn put(&self, key: CacheKey, value: V) {
        self.inner.put(key, value)
    }

    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.contains(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Returns the number of strong references to the underlying cache.
    #[inline]
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl<V> std::fmt::Debug for BoundedTtlCacheHandle<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedTtlCacheHandle")
            .field("inner", &self.inner)
            .field("strong_count", &Arc::strong_count(&self.inner))
            .finish()
    }
}
