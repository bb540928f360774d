//! Logging bootstrap.
//!
//! The library itself only emits `tracing` events; where they end up is the
//! host application's choice.  Hosts that have no subscriber of their own can
//! call [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::LoggingConfig;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to the
/// configured level when the variable is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        let config = LoggingConfig::default();
        let _first = init_logging(&config);
        assert!(!init_logging(&config), "second install must be refused");
    }
}
