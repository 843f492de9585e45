// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Classification and cache-coherence problems never show up here: they are
/// turned into result data. Only cancellation and contract violations are
/// expected to interrupt a caller.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the caller asked to stop
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<crate::port::SourceError> for AppError {
    fn from(err: crate::port::SourceError) -> Self {
        use crate::port::SourceError;
        match err {
            SourceError::NotFound(name) => AppError::NotFound(name),
            SourceError::Network(msg) => AppError::Upstream(msg),
            SourceError::InvalidName(name) => AppError::InvalidArgument(name),
            SourceError::Io(e) => AppError::Io(e),
        }
    }
}

impl From<crate::port::InvokeError> for AppError {
    fn from(err: crate::port::InvokeError) -> Self {
        use crate::port::InvokeError;
        match err {
            InvokeError::Cancelled => AppError::Cancelled,
            other => AppError::Internal(other.to_string()),
        }
    }
}
