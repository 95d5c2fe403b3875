//! Tracing bootstrap for applications embedding the SDK.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::TelemetryConfig;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "VAULTKIT_LOG";

/// Installs a global `tracing` subscriber.
///
/// The filter is read from `VAULTKIT_LOG`, falling back to
/// `config.default_directive`. Returns `false` if a global subscriber was
/// already installed (by an earlier call or by the host application).
pub fn init_tracing(config: &TelemetryConfig) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    installed.is_ok()
}
