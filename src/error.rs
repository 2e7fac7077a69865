//! Error types for flowsync
//!
//! Sync failures are modelled as a single cloneable enum so that the retry
//! executor can hand the last error back to callers and the coordinator can
//! report it over HTTP. All error types use `thiserror`.

use thiserror::Error;

use crate::config::ConfigError;

/// Synchronization-related errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Request exceeded its per-call timeout
    #[error("Network timeout")]
    NetworkTimeout,

    /// Connection refused
    #[error("Connection refused")]
    ConnectionRefused,

    /// Generic network error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP status; the body is never interpreted
    #[error("{reason} -> HTTP {status}")]
    HttpStatus {
        /// Status code returned by the peer
        status: u16,
        /// Request line and canonical reason, e.g. `GET http://.. Not Found`
        reason: String,
    },

    /// Response body could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// XML document could not be parsed
    #[error("Invalid XML: {0}")]
    Xml(String),

    /// First page of the archive listing was empty
    #[error("No snapshots found in local archive")]
    EmptyArchive,

    /// A configured or derived URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl SyncError {
    /// Whether this error is an HTTP 404 from the peer
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::HttpStatus { status: 404, .. })
    }

    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Application-level error type
///
/// Aggregates the domain-specific errors for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Sync error
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP front-end error
    #[error("Server error: {0}")]
    Server(#[from] crate::server::ServerError),

    /// Tracing could not be initialised
    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}

/// Trait for determining if an error is transient
///
/// The retry executor retries every failure regardless; this
/// classification only marks permanent failures in the retry events.
pub trait RetryableError {
    /// Returns true if the error is expected to clear on its own
    fn is_retryable(&self) -> bool;
}

impl RetryableError for SyncError {
    fn is_retryable(&self) -> bool {
        match self {
            SyncError::NetworkTimeout => true,
            SyncError::ConnectionRefused => true,
            SyncError::Network(_) => true,
            SyncError::InvalidData(_) => true,
            SyncError::Xml(_) => true,
            SyncError::EmptyArchive => true,
            SyncError::HttpStatus { status, .. } => !matches!(status, 401 | 403),
            SyncError::InvalidUrl(_) => false,
        }
    }
}
