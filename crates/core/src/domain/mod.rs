// Domain Layer - Guard entities and value types

pub mod error;
pub mod node;
pub mod options;
pub mod resource;
pub mod unit;
pub mod version;

// Re-exports
pub use error::DomainError;
pub use node::{Architecture, Node, OsKind};
pub use options::{parse_env_entry, ExecutionOptions};
pub use resource::{architecture_of, GuardStrategyId, HasArchitecture, ParentResource};
pub use unit::ScriptUnit;
pub use version::{compare_versions, VersionRange};
