//! Logging initialization for the client.
//!
//! All components use standard `tracing` macros; the host calls
//! [`init_logging`] once at startup. Output goes to stderr, with the level
//! taken from `RUST_LOG` when set, otherwise from the provided default.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// # Arguments
///
/// * `level` - Default log level (trace, debug, info, warn, error)
///
/// # Example
///
/// ```ignore
/// init_logging("info");
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // try_init so tests calling this repeatedly do not panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_all_variants() {
        assert_eq!(parse_level("trace"), tracing::Level::TRACE);
        assert_eq!(parse_level("debug"), tracing::Level::DEBUG);
        assert_eq!(parse_level("info"), tracing::Level::INFO);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("warning"), tracing::Level::WARN);
        assert_eq!(parse_level("error"), tracing::Level::ERROR);
    }

    #[test]
    fn parse_level_unknown_defaults_to_info() {
        assert_eq!(parse_level(""), tracing::Level::INFO);
        assert_eq!(parse_level("verbose"), tracing::Level::INFO);
    }

    #[test]
    fn init_logging_is_idempotent() {
        init_logging("debug");
        init_logging("info");
    }
}
