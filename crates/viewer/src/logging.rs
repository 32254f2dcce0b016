use tracing_subscriber::EnvFilter;

use crate::config::ViewerConfig;

/// Installs a `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns `false` when a global subscriber was already installed, which
/// happens when the host embeds more than one viewer.
pub fn init_logging(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Host bootstrap: `config.log_filter` is the fallback directive.
pub fn init_logging_from(config: &ViewerConfig) -> bool {
    init_logging(&config.log_filter)
}
