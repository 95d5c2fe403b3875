//! Per-session context handed to every instrumented component.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{build_cache_store, CacheStore};
use crate::config::SdkConfig;

/// Shared state of one client session: configuration and the injected cache
/// store. Cheap to clone.
#[derive(Clone)]
pub struct SdkContext {
    session_id: Uuid,
    config: Arc<SdkConfig>,
    cache: Arc<dyn CacheStore>,
}

impl SdkContext {
    /// Creates a context whose cache store is built from `config.cache`.
    #[must_use]
    pub fn new(config: SdkConfig) -> Self {
        let cache = build_cache_store(&config.cache);
        Self::with_cache(config, cache)
    }

    /// Creates a context with an externally supplied cache store.
    /// `config.cache` is ignored.
    #[must_use]
    pub fn with_cache(config: SdkConfig, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            config: Arc::new(config),
            cache,
        }
    }

    /// Random id of this session, attached to log records.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[must_use]
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> Arc<dyn CacheStore> {
        Arc::clone(&self.cache)
    }
}

impl Default for SdkContext {
    fn default() -> Self {
        Self::new(SdkConfig::default())
    }
}

impl fmt::Debug for SdkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkContext")
            .field("session_id", &self.session_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
