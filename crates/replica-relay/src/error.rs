//! Error types for replica-relay

use thiserror::Error;

use crate::agent::TimeoutError;

/// Main error type for relay and agent operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Forwarder/HTTP server errors
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Transport-level failure talking to the replica
    #[error("Network error: {0}")]
    Network(String),

    /// The replica answered with a non-success status
    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Identity could not produce what was asked of it (e.g. anonymous signing)
    #[error("Identity error: {0}")]
    Identity(String),

    /// Login flow failed or was cancelled
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Actor was asked to invoke a method its service does not declare
    #[error("Unknown method '{method}' on service {service}")]
    UnknownMethod { service: String, method: String },

    /// A call did not finish within its deadline
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
