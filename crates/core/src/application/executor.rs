// Guard command executor
//
// Binds one resolved strategy to one command. Every `run_command` call builds
// a fresh unit in a fresh context and re-executes the command; `last_result`
// only records what the latest call returned.

use std::sync::Arc;
use tracing::debug;

use super::constants::{GUARD_SUCCESS_EXIT_CODE, GUARD_UNIT_PREFIX};
use super::context::{GuardRunContext, UnitOutcome};
use crate::domain::{Architecture, ExecutionOptions, Node, ScriptUnit};
use crate::error::Result;
use crate::port::id_provider::UuidProvider;
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{GuardStrategy, IdProvider, ProcessRunner, TimeProvider};

/// Collaborators a guard needs to run: the node it evaluates on and the
/// process adapter
#[derive(Clone)]
pub struct GuardHost {
    pub node: Arc<Node>,
    pub runner: Arc<dyn ProcessRunner>,
    pub time_provider: Arc<dyn TimeProvider>,
    pub id_provider: Arc<dyn IdProvider>,
}

impl GuardHost {
    pub fn new(node: Arc<Node>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            node,
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
}

/// Evaluates one guard command to a boolean.
///
/// Not meant for concurrent use: `run_command` takes `&mut self`.
pub struct GuardCommandExecutor {
    strategy: Arc<dyn GuardStrategy>,
    parent_name: String,
    command: String,
    architecture: Option<Architecture>,
    host: GuardHost,
    last_result: Option<bool>,
}

impl GuardCommandExecutor {
    /// Pure constructor; nothing runs until `run_command`
    pub fn new(
        strategy: Arc<dyn GuardStrategy>,
        parent_name: impl Into<String>,
        command: impl Into<String>,
        architecture: Option<Architecture>,
        host: GuardHost,
    ) -> Self {
        Self {
            strategy,
            parent_name: parent_name.into(),
            command: command.into(),
            architecture,
            host,
            last_result: None,
        }
    }

    /// Name of the internal unit: prefix, strategy type, parent name
    pub fn unit_name(&self) -> String {
        format!(
            "{}-{}-{}",
            GUARD_UNIT_PREFIX,
            self.strategy.name(),
            self.parent_name
        )
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn architecture(&self) -> Option<Architecture> {
        self.architecture
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Result of the most recent successful evaluation
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    pub fn last_command_succeeded(&self) -> bool {
        self.last_result.unwrap_or(false)
    }

    fn build_unit(&self, options: &ExecutionOptions) -> ScriptUnit {
        let mut unit = ScriptUnit::new(self.unit_name()).code(self.command.clone());
        if let Some(architecture) = self.architecture {
            unit = unit.architecture(architecture);
        }
        unit.returns(vec![GUARD_SUCCESS_EXIT_CODE])
            .apply_options(options)
    }

    /// Run the guard command and report whether it exited 0
    ///
    /// A non-zero exit, a signal, or a timeout yields `Ok(false)`.
    ///
    /// # Errors
    /// - GuardError::ExecutionUnavailable if the command cannot be attempted
    /// - GuardError::ArchitectureUnsupported if the node lacks the pinned word size
    pub async fn run_command(&mut self, options: &ExecutionOptions) -> Result<bool> {
        let unit = self.build_unit(options);
        let mut context = GuardRunContext::new(
            self.host.node.clone(),
            self.host.runner.clone(),
            self.host.time_provider.clone(),
            self.host.id_provider.as_ref(),
        );

        let outcome = context.run_unit(&unit, self.strategy.as_ref()).await?;
        let succeeded = matches!(outcome, UnitOutcome::Succeeded { .. });

        debug!(
            run_id = %context.run_id(),
            unit = %unit.name(),
            succeeded = succeeded,
            "Guard evaluated"
        );

        self.last_result = Some(succeeded);
        Ok(succeeded)
    }
}

impl std::fmt::Debug for GuardCommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardCommandExecutor")
            .field("strategy", &self.strategy.name())
            .field("parent_name", &self.parent_name)
            .field("command", &self.command)
            .field("architecture", &self.architecture)
            .field("last_result", &self.last_result)
            .finish()
    }
}
