use crate::error::ConfigError;
use log::LevelFilter;

/// Parse a log verbosity name
///
/// Besides the usual `trace`..`error`, accepts `fatal` and `panic` (both
/// treated as `error`), `disabled` (no output) and an empty value (`info`).
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` for any other value.
pub fn parse_log_level(value: &str) -> Result<LevelFilter, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "info" => Ok(LevelFilter::Info),
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" | "fatal" | "panic" => Ok(LevelFilter::Error),
        "disabled" | "off" => Ok(LevelFilter::Off),
        other => Err(ConfigError::ValidationError(format!(
            "unknown log level '{}'",
            other
        ))),
    }
}
