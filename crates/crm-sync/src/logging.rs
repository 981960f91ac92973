//! Native log setup
//!
//! The browser build logs to the console; native hosts and tests route
//! `tracing` output through a formatted subscriber.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "crm_sync=info";

/// Install the global subscriber. Safe to call more than once.
pub fn init() {
    init_with(DEFAULT_FILTER);
}

/// Install the global subscriber with a fallback filter used when `RUST_LOG` is unset
pub fn init_with(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
