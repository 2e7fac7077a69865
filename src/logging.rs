//! Tracing subscriber setup for flowsync

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Logging initialisation errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// A global subscriber is already installed
    #[error("Failed to initialize tracing: {0}")]
    Init(String),

    /// The configured level is not a tracing level
    #[error("Unknown log level: {0}")]
    InvalidLevel(String),
}

/// Map a configured level string to a tracing level
pub fn parse_level(log_level: &str) -> Result<Level, LoggingError> {
    match log_level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(LoggingError::InvalidLevel(log_level.to_string())),
    }
}

/// Install the global tracing subscriber
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = tracing_subscriber::filter::LevelFilter::from_level(parse_level(&config.level)?);

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.format.eq_ignore_ascii_case("pretty") {
        registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    };

    result.map_err(|e| LoggingError::Init(e.to_string()))
}
