//! Error types for pub/sub backends

use thiserror::Error;

/// Errors reported by a pub/sub backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Connection is not open")]
    NotOpen,

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl ConnectionError {
    /// Wrap any displayable backend failure.
    pub fn backend(error: impl std::fmt::Display) -> Self {
        Self::Backend(error.to_string())
    }
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, ConnectionError>;
