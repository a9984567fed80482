//! Logging initialization for the service binary.

use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}
