//! `VaultKit` SDK — instrumentation for service components: every declared
//! operation gets normalized errors, result events, and (for read-only
//! components) read-through caching.

pub mod cache;
pub mod config;
pub mod context;
pub mod events;
pub mod service;
pub mod telemetry;

pub use cache::{CacheError, CacheStats, CacheStatsSnapshot, CacheStore};
pub use config::{CacheBackend, CacheConfig, SdkConfig, TelemetryConfig};
pub use context::SdkContext;
pub use events::{Event, EventChannel, HandlerFailures, SubscriptionHandle};
pub use service::{
    instrument, instrument_reader, CallKind, Component, Instrumented, OperationTable, Outcome,
    Reader, RegistrationError, ServiceRegistry,
};
pub use vaultkit_core::{args, Args, CacheKey, DomainError, FailureOrigin, OperationDescriptor};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
