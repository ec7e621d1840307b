// Central Error Type for guard evaluation

use thiserror::Error;

use crate::domain::{Architecture, GuardStrategyId, OsKind};
use crate::port::ExecutionError;

/// Guard-level error type.
///
/// A command exiting non-zero is not an error: it is the `false` outcome.
/// Everything here propagates to the convergence engine.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error(
        "No guard strategy '{identifier}' registered for {os} platform '{platform}' version '{version}'"
    )]
    UnsupportedPlatform {
        os: OsKind,
        platform: String,
        version: String,
        identifier: GuardStrategyId,
    },

    #[error("Architecture {requested} is not supported on node machine '{machine}'")]
    ArchitectureUnsupported {
        requested: Architecture,
        machine: String,
    },

    #[error("Guard unit '{unit}' could not be executed: {source}")]
    ExecutionUnavailable {
        unit: String,
        #[source]
        source: ExecutionError,
    },

    #[error("Unit '{0}' is already declared in this run context")]
    DuplicateUnit(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Result type alias using GuardError
pub type Result<T> = std::result::Result<T, GuardError>;
