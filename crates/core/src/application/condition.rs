// Single-guard conditions (only_if / not_if)

use tracing::debug;

use super::executor::GuardCommandExecutor;
use crate::domain::ExecutionOptions;
use crate::error::Result;

/// Polarity of a guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardKind {
    /// Run the action only if the condition holds
    OnlyIf,
    /// Skip the action if the condition holds
    NotIf,
}

impl GuardKind {
    /// Whether a condition value means "skip the action"
    pub fn skips_on(&self, condition: bool) -> bool {
        match self {
            GuardKind::OnlyIf => !condition,
            GuardKind::NotIf => condition,
        }
    }
}

/// Where the condition value comes from
pub enum GuardSource {
    Command {
        executor: GuardCommandExecutor,
        options: ExecutionOptions,
    },
    Block(Box<dyn Fn() -> bool + Send + Sync>),
}

/// One guard attached to an action
pub struct Guard {
    kind: GuardKind,
    source: GuardSource,
}

impl Guard {
    pub fn new(kind: GuardKind, source: GuardSource) -> Self {
        Self { kind, source }
    }

    pub fn only_if(executor: GuardCommandExecutor, options: ExecutionOptions) -> Self {
        Self::new(GuardKind::OnlyIf, GuardSource::Command { executor, options })
    }

    pub fn not_if(executor: GuardCommandExecutor, options: ExecutionOptions) -> Self {
        Self::new(GuardKind::NotIf, GuardSource::Command { executor, options })
    }

    pub fn only_if_block(block: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self::new(GuardKind::OnlyIf, GuardSource::Block(Box::new(block)))
    }

    pub fn not_if_block(block: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self::new(GuardKind::NotIf, GuardSource::Block(Box::new(block)))
    }

    pub fn kind(&self) -> GuardKind {
        self.kind
    }

    /// Evaluate the condition itself
    pub async fn evaluate(&mut self) -> Result<bool> {
        match &mut self.source {
            GuardSource::Command { executor, options } => executor.run_command(options).await,
            GuardSource::Block(block) => Ok(block()),
        }
    }

    /// Whether the guarded action should be skipped
    pub async fn should_skip(&mut self) -> Result<bool> {
        let condition = self.evaluate().await?;
        let skip = self.kind.skips_on(condition);
        debug!(kind = ?self.kind, condition = condition, skip = skip, "Guard decision");
        Ok(skip)
    }
}
