// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid architecture: {0}")]
    InvalidArchitecture(String),

    #[error("Invalid OS kind: {0}")]
    InvalidOsKind(String),

    #[error("Invalid environment entry (expected KEY=VALUE): {0}")]
    InvalidEnvironmentEntry(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
