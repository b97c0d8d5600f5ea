//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::FrameworkConfig;

/// Installs a formatted subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// [`init`] with the configured `log_filter`.
pub fn init_from_config(config: &FrameworkConfig) -> bool {
    init(&config.log_filter)
}
