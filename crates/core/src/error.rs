// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// No queue backend can be located for the default queue.
    /// Unrecoverable: startup code prints the configuration guide and exits.
    #[error("Missing backend: {0}")]
    MissingBackend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Task error: {0}")]
    Task(#[from] crate::domain::TaskError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True for failures that must stop the process at startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::MissingBackend(_))
    }
}
