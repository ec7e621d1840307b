// Interpreter extensions
//
// Any ParentResource can declare a guard for a specific interpreter. Each
// interpreter is a marker type naming its strategy identifier; the
// declaration reads the host's architecture capability, resolves the
// strategy for the host's node and binds the command.

use std::sync::Arc;

use super::executor::{GuardCommandExecutor, GuardHost};
use super::resolver::GuardStrategyResolver;
use crate::domain::{architecture_of, GuardStrategyId, ParentResource};
use crate::error::Result;
use crate::port::id_provider::UuidProvider;
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{IdProvider, ProcessRunner, TimeProvider};

/// A pluggable guard interpreter
pub trait GuardInterpreter {
    const IDENTIFIER: &'static str;
}

/// Windows PowerShell (`powershell_script`)
pub struct PowerShellInterpreter;

impl GuardInterpreter for PowerShellInterpreter {
    const IDENTIFIER: &'static str = "powershell_script";
}

/// POSIX shell (`script`)
pub struct ShellInterpreter;

impl GuardInterpreter for ShellInterpreter {
    const IDENTIFIER: &'static str = "script";
}

pub struct BashInterpreter;

impl GuardInterpreter for BashInterpreter {
    const IDENTIFIER: &'static str = "bash";
}

/// cmd.exe (`batch`)
pub struct BatchInterpreter;

impl GuardInterpreter for BatchInterpreter {
    const IDENTIFIER: &'static str = "batch";
}

/// What a guard declaration needs besides the resource itself
#[derive(Clone)]
pub struct GuardRuntime {
    resolver: GuardStrategyResolver,
    runner: Arc<dyn ProcessRunner>,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl GuardRuntime {
    pub fn new(resolver: GuardStrategyResolver, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            resolver,
            runner,
            time_provider: Arc::new(SystemTimeProvider),
            id_provider: Arc::new(UuidProvider),
        }
    }

    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn with_id_provider(mut self, id_provider: Arc<dyn IdProvider>) -> Self {
        self.id_provider = id_provider;
        self
    }

    pub fn resolver(&self) -> &GuardStrategyResolver {
        &self.resolver
    }

    /// Declare a guard for `identifier` on `resource`.
    ///
    /// No command means no guard: returns `Ok(None)` without resolving.
    ///
    /// # Errors
    /// - GuardError::UnsupportedPlatform at declaration time, not at run time
    pub fn declare<R: ParentResource + ?Sized>(
        &self,
        resource: &R,
        identifier: &GuardStrategyId,
        command: Option<&str>,
    ) -> Result<Option<GuardCommandExecutor>> {
        let Some(command) = command else {
            return Ok(None);
        };

        let node = resource.node();
        let strategy = self.resolver.resolve(node, identifier)?;
        let host = GuardHost::new(Arc::new(node.clone()), self.runner.clone())
            .with_time_provider(self.time_provider.clone())
            .with_id_provider(self.id_provider.clone());

        Ok(Some(GuardCommandExecutor::new(
            strategy,
            resource.name(),
            command,
            architecture_of(resource),
            host,
        )))
    }
}

/// Guard declarations available on every resource
pub trait GuardDeclarations: ParentResource {
    fn guard_with<I: GuardInterpreter>(
        &self,
        runtime: &GuardRuntime,
        command: Option<&str>,
    ) -> Result<Option<GuardCommandExecutor>> {
        runtime.declare(self, &GuardStrategyId::new(I::IDENTIFIER), command)
    }

    fn powershell(
        &self,
        runtime: &GuardRuntime,
        command: Option<&str>,
    ) -> Result<Option<GuardCommandExecutor>> {
        self.guard_with::<PowerShellInterpreter>(runtime, command)
    }

    fn script(
        &self,
        runtime: &GuardRuntime,
        command: Option<&str>,
    ) -> Result<Option<GuardCommandExecutor>> {
        self.guard_with::<ShellInterpreter>(runtime, command)
    }

    fn bash(
        &self,
        runtime: &GuardRuntime,
        command: Option<&str>,
    ) -> Result<Option<GuardCommandExecutor>> {
        self.guard_with::<BashInterpreter>(runtime, command)
    }

    fn batch(
        &self,
        runtime: &GuardRuntime,
        command: Option<&str>,
    ) -> Result<Option<GuardCommandExecutor>> {
        self.guard_with::<BatchInterpreter>(runtime, command)
    }
}

impl<T: ParentResource + ?Sized> GuardDeclarations for T {}
