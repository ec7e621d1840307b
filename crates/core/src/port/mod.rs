// Port Layer - Interfaces for external dependencies

pub mod guard_strategy;
pub mod id_provider; // For deterministic testing
pub mod node_probe;
pub mod process_runner;
pub mod time_provider;

// Re-exports
pub use guard_strategy::{ensure_architecture, GuardStrategy};
pub use id_provider::IdProvider;
pub use node_probe::NodeProbe;
pub use process_runner::{
    ExecutionError, ExecutionResult, ExecutionStatus, ProcessRunner, ProcessSpec,
};
pub use time_provider::TimeProvider;
