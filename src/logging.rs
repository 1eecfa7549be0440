//! Logging configuration for the gateway.
//!
//! Logs go to stderr. `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

/// Builds the filter: `RUST_LOG` if set, otherwise `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initializes stderr logging.
pub fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
