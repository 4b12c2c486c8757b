//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Compact human-readable lines (the simulate binary is watched live);
/// filtering via RUST_LOG. Safe to call multiple times (subsequent calls
/// are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .with_target(false)
        .try_init();
}
