//! Logging setup

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "bulkpay=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`
///
/// Does nothing if a global subscriber is already installed, so it is safe
/// to call from tests and from embedding applications alike.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
