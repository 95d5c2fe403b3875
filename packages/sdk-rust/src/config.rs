//! SDK configuration types.

use std::time::Duration;

/// Top-level configuration shared by every component of a client session.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Cache backend selection for read-only components.
    pub cache: CacheConfig,
    /// Log output settings.
    pub telemetry: TelemetryConfig,
    /// When `true`, a failing event handler turns the call into a
    /// `DomainError`. When `false`, the failure is logged and the successful
    /// result is still returned.
    pub fail_on_handler_error: bool,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            telemetry: TelemetryConfig::default(),
            fail_on_handler_error: true,
        }
    }
}

/// Which cache store backs read-only components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Unbounded in-memory map; entries live for the whole session.
    Memory,
    /// Capacity-bounded in-memory cache with optional TTL.
    Bounded,
    /// No caching: every lookup misses.
    Disabled,
}

/// Cache store configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Maximum number of entries. Only used by [`CacheBackend::Bounded`].
    pub capacity: usize,
    /// Entry lifetime. Only used by [`CacheBackend::Bounded`]; `None` keeps
    /// entries until evicted for capacity.
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            capacity: 10_000,
            ttl: None,
        }
    }
}

/// Log output settings used by [`crate::telemetry::init_tracing`].
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive used when `VAULTKIT_LOG` is not set.
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            json: false,
        }
    }
}
