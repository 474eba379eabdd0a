//! Dispatch result caching with TTL.
//!
//! Results are stored under the [`DispatchCacheKey`] derived from the
//! dispatch request, so logically identical requests share one entry
//! regardless of how their ID sets were ordered.
//!
//! The cache uses Moka's async Cache which provides:
//! - Lock-free concurrent reads
//! - Automatic TTL-based eviction
//! - Memory-bounded storage
//!
//! # Cache Safety
//!
//! By default, caching is **disabled** (`enabled: false`). Keys embed the
//! request's at-revision, so entries never answer for a different snapshot,
//! but operators should still opt in explicitly.
//!
//! # Example
//!
//! ```rust,ignore
//! use rszed_domain::cache::{DispatchCache, DispatchCacheConfig};
//! use rszed_domain::dispatch::CacheKeyed;
//!
//! let cache = DispatchCache::new(DispatchCacheConfig::default().with_enabled(true));
//! cache.insert(request.cache_key(), true).await;
//! assert_eq!(cache.get(&request.cache_key()).await, Some(true));
//! ```

use std::time::Duration;

use moka::future::Cache;

use crate::dispatch::DispatchCacheKey;

/// Configuration for the dispatch cache.
#[derive(Debug, Clone)]
pub struct DispatchCacheConfig {
    /// Whether caching is enabled. Defaults to `false`.
    pub enabled: bool,
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,
    /// Default TTL for cache entries.
    pub default_ttl: Duration,
}

impl Default for DispatchCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: 100_000,
            default_ttl: Duration::from_secs(10),
        }
    }
}

impl DispatchCacheConfig {
    /// Enables or disables caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Sets the default TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

/// Dispatch result cache keyed by canonical request identity.
///
/// Fully thread-safe; clones share the same underlying storage.
#[derive(Clone)]
pub struct DispatchCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<DispatchCacheKey, V>,
    config: DispatchCacheConfig,
}

impl<V> std::fmt::Debug for DispatchCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl<V> DispatchCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new dispatch cache with the given configuration.
    pub fn new(config: DispatchCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.default_ttl)
            .build();

        Self { cache, config }
    }

    pub fn config(&self) -> &DispatchCacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Inserts a result. No-op when caching is disabled.
    pub async fn insert(&self, key: DispatchCacheKey, value: V) {
        if !self.config.enabled {
            return;
        }
        self.cache.insert(key, value).await;
    }

    /// Retrieves a cached result.
    ///
    /// # Metrics
    ///
    /// - `rszed_dispatch_cache_hits_total` - Incremented on cache hit
    /// - `rszed_dispatch_cache_misses_total` - Incremented on cache miss
    pub async fn get(&self, key: &DispatchCacheKey) -> Option<V> {
        if !self.config.enabled {
            return None;
        }
        let result = self.cache.get(key).await;
        if result.is_some() {
            metrics::counter!("rszed_dispatch_cache_hits_total").increment(1);
        } else {
            metrics::counter!("rszed_dispatch_cache_misses_total").increment(1);
        }
        result
    }

    /// Removes a single entry.
    pub async fn invalidate(&self, key: &DispatchCacheKey) {
        self.cache.invalidate(key).await;
    }

    /// Removes every entry.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the approximate number of entries in the cache.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance tasks (evictions, invalidations).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

/// Registers dispatch cache metric descriptions.
///
/// Optional; provides documentation for exporters that support it.
pub fn register_cache_metrics() {
    metrics::describe_counter!(
        "rszed_dispatch_cache_hits_total",
        "Total number of dispatch cache hits"
    );
    metrics::describe_counter!(
        "rszed_dispatch_cache_misses_total",
        "Total number of dispatch cache misses"
    );
}
