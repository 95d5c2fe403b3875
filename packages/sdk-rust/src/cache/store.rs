//! The [`CacheStore`] contract consumed by the caching layer.

use serde_json::Value;
use vaultkit_core::CacheKey;

/// Failure of a cache backend. Surfaced to callers as a `DomainError`
/// attributed to the operation that touched the cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache backend error: {0:#}")]
    Backend(#[from] anyhow::Error),
}

/// Key-value store backing read-only components.
///
/// Implementations must tolerate concurrent `get`/`set` from many in-flight
/// operations. Each `set` fully replaces the value under its key. Expiry and
/// eviction are internal to the store and are only visible as `get`
/// returning `Ok(None)`.
///
/// Calls are synchronous: the caching layer never adds a suspension point of
/// its own.
///
/// Used as `Arc<dyn CacheStore>`.
pub trait CacheStore: Send + Sync + 'static {
    /// Looks up `key`. `Ok(None)` means absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be read.
    fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be written.
    fn set(&self, key: CacheKey, value: Value) -> Result<(), CacheError>;
}
