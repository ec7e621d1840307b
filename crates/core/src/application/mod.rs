// Application Layer - Guard resolution and evaluation

pub mod condition;
pub mod constants;
pub mod context;
pub mod executor;
pub mod extension;
pub mod registry;
pub mod resolver;

// Re-exports
pub use condition::{Guard, GuardKind, GuardSource};
pub use context::{EventSink, GuardEvent, GuardRunContext, UnitOutcome};
pub use executor::{GuardCommandExecutor, GuardHost};
pub use extension::{
    BashInterpreter, BatchInterpreter, GuardDeclarations, GuardInterpreter, GuardRuntime,
    PowerShellInterpreter, ShellInterpreter,
};
pub use registry::{StrategyFactory, StrategyKey, StrategyRegistry};
pub use resolver::GuardStrategyResolver;
