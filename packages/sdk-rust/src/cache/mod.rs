//! Cache stores for read-only components.
//!
//! - [`CacheStore`]: the contract the caching layer consumes
//! - [`MemoryCacheStore`]: unbounded `DashMap` store, never expires
//! - [`BoundedCacheStore`]: `quick_cache` store with capacity and optional TTL
//! - [`NullCacheStore`]: stores nothing (caching disabled)
//! - [`CacheStats`]: hit/miss counters shared by a component's cached operations
//!
//! Stores are injected through [`SdkContext`](crate::context::SdkContext);
//! [`build_cache_store`] picks one from [`CacheConfig`].

pub mod bounded;
pub mod memory;
pub mod null;
pub mod stats;
pub mod store;

use std::sync::Arc;

pub use bounded::BoundedCacheStore;
pub use memory::MemoryCacheStore;
pub use null::NullCacheStore;
pub use stats::{CacheStats, CacheStatsSnapshot};
pub use store::{CacheError, CacheStore};

use crate::config::{CacheBackend, CacheConfig};

/// Creates the store selected by `config.backend`.
#[must_use]
pub fn build_cache_store(config: &CacheConfig) -> Arc<dyn CacheStore> {
    match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
        CacheBackend::Bounded => Arc::new(BoundedCacheStore::new(config.capacity, config.ttl)),
        CacheBackend::Disabled => Arc::new(NullCacheStore),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vaultkit_core::{args, encode, OperationDescriptor};

    use super::*;

    fn roundtrips(store: &Arc<dyn CacheStore>) -> bool {
        let key = encode(&OperationDescriptor::new("Lens", "getAssets").unwrap(), &args![]);
        store.set(key.clone(), json!([1])).unwrap();
        store.get(&key).unwrap().is_some()
    }

    #[test]
    fn memory_backend_keeps_values() {
        let store = build_cache_store(&CacheConfig::default());
        assert!(roundtrips(&store));
    }

    #[test]
    fn bounded_backend_keeps_values() {
        let config = CacheConfig {
            backend: CacheBackend::Bounded,
            capacity: 4,
            ..CacheConfig::default()
        };
        assert!(roundtrips(&build_cache_store(&config)));
    }

    #[test]
    fn disabled_backend_never_hits() {
        let config = CacheConfig {
            backend: CacheBackend::Disabled,
            ..CacheConfig::default()
        };
        assert!(!roundtrips(&build_cache_store(&config)));
    }

    /// Verifies `Arc<dyn CacheStore>` compiles (object safety).
    #[test]
    fn cache_store_is_object_safe() {
        fn _assert_object_safe(_: &Arc<dyn CacheStore>) {}
    }
}
