//! Logging System
//!
//! Structured logging implementation using the `tracing` crate. Provides a
//! configurable level and output format, with the `VOLDIR_LOG` environment
//! variable taking precedence over configuration.

use crate::error::DirectoryError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Whether logging is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

/// Initialize the logging system
///
/// Events go to stderr; the embedding server owns any file redirection.
/// Fails if a subscriber is already installed for this process.
pub fn init_logging(config: &LoggingConfig) -> Result<(), DirectoryError> {
    if !config.enabled {
        Registry::default()
            .with(EnvFilter::new("off"))
            .with(fmt::layer().with_writer(|| std::io::sink()))
            .try_init()
            .map_err(|e| DirectoryError::Config(format!("failed to set subscriber: {}", e)))?;
        return Ok(());
    }

    let filter = build_env_filter(config)?;

    match config.format.as_str() {
        "json" => Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| DirectoryError::Config(format!("failed to set subscriber: {}", e)))?,
        "text" => Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(config.color)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .map_err(|e| DirectoryError::Config(format!("failed to set subscriber: {}", e)))?,
        other => {
            return Err(DirectoryError::Config(format!(
                "invalid log format: {} (must be 'json' or 'text')",
                other
            )))
        }
    }

    Ok(())
}

/// Build environment filter from config or the environment
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, DirectoryError> {
    if let Ok(filter) = EnvFilter::try_from_env("VOLDIR_LOG") {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        DirectoryError::Config(format!("invalid log level '{}': {}", config.level, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert!(config.enabled);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, "text");
        assert!(config.color);
    }

    #[test]
    fn test_build_env_filter_accepts_levels() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            ..Default::default()
        };
        assert!(build_env_filter(&config).is_ok());
    }

    #[test]
    fn test_build_env_filter_rejects_garbage() {
        let config = LoggingConfig {
            level: "!!!".to_string(),
            ..Default::default()
        };
        assert!(build_env_filter(&config).is_err());
    }
}
