//! Error types for docchat-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using docchat-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure, suitable for UI decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Bad upload, rejected before reaching the network
    Validation,
    /// Connection refused, DNS failure, offline
    Network,
    /// Deadline exceeded
    Timeout,
    /// The service has no processed document for this chat turn
    Precondition,
    /// The service answered with a failure
    Server,
    /// Local failure (storage, bridge, serialization, configuration)
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Network => write!(f, "network"),
            Self::Timeout => write!(f, "timeout"),
            Self::Precondition => write!(f, "precondition"),
            Self::Server => write!(f, "server"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Errors that can occur during docchat operations.
///
/// The `Display` text of the first five variants is meant to be shown to the
/// user as-is.
#[derive(Error, Debug)]
pub enum Error {
    /// Upload rejected locally (wrong type, too large)
    #[error("{0}")]
    Validation(String),

    /// Transport-level failure
    #[error("{0}")]
    Network(String),

    /// Timeout during operation
    #[error("Request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Chat turn sent before a document was processed
    #[error("{0}")]
    Precondition(String),

    /// Remote service reported a failure
    #[error("{message}")]
    Server {
        status: Option<u16>,
        message: String,
    },

    /// State store error
    #[error("State storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a server error.
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Network(_) => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Server { .. } => ErrorKind::Server,
            Self::Storage(_) | Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Network | ErrorKind::Timeout)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
