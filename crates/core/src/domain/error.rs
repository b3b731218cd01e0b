// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid consumer option: {0}")]
    InvalidConsumerOption(String),

    #[error("Invalid task options: {0}")]
    InvalidTaskOptions(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
