//! Cache effectiveness counters.
//!
//! One [`CacheStats`] is shared by all cached operations of an instrumented
//! component. The caching layer also emits `metrics` counters per operation
//! (see [`record_hit`] / [`record_miss`]).

use std::sync::atomic::{AtomicU64, Ordering};

use vaultkit_core::OperationDescriptor;

/// Metric name for cache hits.
pub const CACHE_HITS_TOTAL: &str = "vaultkit_cache_hits_total";
/// Metric name for cache misses.
pub const CACHE_MISSES_TOTAL: &str = "vaultkit_cache_misses_total";

/// Atomic hit/miss/store/error counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub errors: u64,
}

impl CacheStatsSnapshot {
    /// Fraction of lookups served from the cache, or `None` before the first
    /// lookup.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }
}

impl CacheStats {
    #[must_use]
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_hit(&self, descriptor: &OperationDescriptor) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        record_hit(descriptor);
    }

    pub(crate) fn record_miss(&self, descriptor: &OperationDescriptor) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        record_miss(descriptor);
    }

    pub(crate) fn record_store(&self) {
        self.stores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Increments the global hit counter for `descriptor`.
pub fn record_hit(descriptor: &OperationDescriptor) {
    metrics::counter!(
        CACHE_HITS_TOTAL,
        "component" => descriptor.component,
        "operation" => descriptor.operation
    )
    .increment(1);
}

/// Increments the global miss counter for `descriptor`.
pub fn record_miss(descriptor: &OperationDescriptor) {
    metrics::counter!(
        CACHE_MISSES_TOTAL,
        "component" => descriptor.component,
        "operation" => descriptor.operation
    )
    .increment(1);
}
