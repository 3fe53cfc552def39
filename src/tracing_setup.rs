//! Tracing Infrastructure
//!
//! Structured logging for the sampling core and the CLI, built on `tracing` and
//! `tracing-subscriber`:
//! - Structured events with fields (`channel`, `timestamp`, `events`, ...)
//! - Multiple output formats (pretty, compact, JSON)
//! - `RUST_LOG` environment filtering on top of the configured level
//!
//! The library only emits events; installing a subscriber is left to the binary
//! (or to a test that wants to see output).
//!
//! # Example
//! ```no_run
//! use touch_daq::{config::SessionConfig, tracing_setup};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::load()?;
//! tracing_setup::init_from_config(&config)?;
//! info!(capacity = config.store.capacity, "Session started");
//! # Ok(())
//! # }
//! ```

use crate::config::SessionConfig;
use std::io::IsTerminal;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log line layout on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, colored when stderr is a terminal
    Pretty,
    /// One line per event
    Compact,
    /// One JSON object per event
    Json,
}

/// Subscriber settings derived from `[application]`.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Output format
    pub format: OutputFormat,
    /// Include source file and line
    pub with_file_and_line: bool,
    /// Include thread names (producer and consumer run on separate threads)
    pub with_thread_names: bool,
    /// Color escapes; off when stderr is redirected
    pub with_ansi: bool,
}

impl TracingConfig {
    /// Build from the session's `log_level` and `log_format`
    pub fn from_session_config(config: &SessionConfig) -> Result<Self, String> {
        Ok(Self {
            level: parse_log_level(&config.application.log_level)?,
            format: parse_output_format(&config.application.log_format)?,
            with_file_and_line: true,
            with_thread_names: true,
            with_ansi: std::io::stderr().is_terminal(),
        })
    }
}

/// Initialize tracing from the session configuration
pub fn init_from_config(config: &SessionConfig) -> Result<(), String> {
    init(TracingConfig::from_session_config(config)?)
}

/// Install the global subscriber. Logs go to stderr; stdout carries touch output.
///
/// Returns `Ok(())` without changes when a subscriber is already installed.
pub fn init(config: TracingConfig) -> Result<(), String> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let base = fmt::layer()
        .with_file(config.with_file_and_line)
        .with_line_number(config.with_file_and_line)
        .with_thread_names(config.with_thread_names)
        .with_writer(std::io::stderr);

    let layer = match config.format {
        OutputFormat::Pretty => base.pretty().with_ansi(config.with_ansi).boxed(),
        OutputFormat::Compact => base.compact().with_ansi(false).boxed(),
        OutputFormat::Json => base.json().with_ansi(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(env_filter))
        .try_init()
        .or_else(|e| {
            // Lost a race with another initializer
            if e
                .to_string()
                .contains("a global default trace dispatcher has already been set")
            {
                Ok(())
            } else {
                Err(format!("Failed to initialize tracing: {}", e))
            }
        })
}

/// Parse log level string into tracing Level
fn parse_log_level(level: &str) -> Result<Level, String> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        )),
    }
}

/// Parse output format string
fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "pretty" => Ok(OutputFormat::Pretty),
        "compact" => Ok(OutputFormat::Compact),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!(
            "Invalid log format '{}'. Must be one of: pretty, compact, json",
            format
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));

        // Case insensitive
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));

        // Invalid
        assert!(parse_log_level("invalid").is_err());
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!(parse_output_format("JSON"), Ok(OutputFormat::Json));
        assert_eq!(parse_output_format("compact"), Ok(OutputFormat::Compact));
        assert!(parse_output_format("xml").is_err());
    }

    #[test]
    fn test_tracing_config_from_session() {
        let mut session = SessionConfig::default();
        session.application.log_level = "debug".to_string();
        session.application.log_format = "json".to_string();

        let config = TracingConfig::from_session_config(&session).unwrap();
        assert!(matches!(config.level, Level::DEBUG));
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.with_thread_names);

        session.application.log_level = "chatty".to_string();
        assert!(TracingConfig::from_session_config(&session).is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut session = SessionConfig::default();
        session.application.log_format = "compact".to_string();
        let config = TracingConfig::from_session_config(&session).unwrap();

        assert!(init(config.clone()).is_ok());
        assert!(init(TracingConfig {
            level: Level::DEBUG,
            ..config
        })
        .is_ok());
    }
}
