//! Tracing bootstrap for embedders and tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize a global tracing subscriber with env-filter support.
///
/// Safe to call repeatedly; only the first call installs a subscriber.
/// Embedders that install their own subscriber should skip this.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init();
        ::tracing::debug!("tracing initialized");
    });
}
