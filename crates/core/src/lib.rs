// Scriptguard Core - Guard command evaluation, domain & ports
// NO infrastructure dependencies (ADR-001: Hexagonal Architecture)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{GuardError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
