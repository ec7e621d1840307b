// Scriptguard Infrastructure - System Adapters
// Implements: ProcessRunner, GuardStrategy (built-in interpreters), NodeProbe

pub mod node_probe_impl;
pub mod registry;
pub mod strategies;
pub mod subprocess_runner;

pub use node_probe_impl::SysinfoNodeProbe;
pub use registry::{default_registry, register_defaults};
pub use strategies::{Bash, Batch, PosixShell, PowerShell, WindowsSystemDirs};
pub use subprocess_runner::SubprocessRunner;
