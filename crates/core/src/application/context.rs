// Isolated run context for guard units
//
// Each guard invocation gets its own context: event sink, unit collection and
// run id. Nothing in here is shared with the parent run; the context is
// dropped when the invocation returns.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Node, ScriptUnit};
use crate::error::{GuardError, Result};
use crate::port::{ExecutionError, GuardStrategy, IdProvider, ProcessRunner, TimeProvider};

/// Outcome of running one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Exit status matched the unit's expectation
    Succeeded { exit_code: i32 },
    /// Non-matching exit status, death by signal, or timeout (exit_code None)
    Failed { exit_code: Option<i32> },
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Succeeded { .. })
    }
}

/// Notifications emitted while a unit runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardEvent {
    UnitStarted {
        unit: String,
        at_ms: i64,
    },
    UnitSucceeded {
        unit: String,
        exit_code: i32,
        duration_ms: i64,
    },
    UnitFailed {
        unit: String,
        exit_code: Option<i32>,
        duration_ms: i64,
    },
    UnitTimedOut {
        unit: String,
        timeout_ms: i64,
    },
    UnitErrored {
        unit: String,
        reason: String,
    },
}

/// Event sink owned by exactly one run context
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<GuardEvent>,
}

impl EventSink {
    pub fn emit(&mut self, event: GuardEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GuardEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Fresh, exclusively owned execution context for one guard invocation
pub struct GuardRunContext {
    run_id: String,
    node: Arc<Node>,
    runner: Arc<dyn ProcessRunner>,
    time_provider: Arc<dyn TimeProvider>,
    events: EventSink,
    units: HashSet<String>,
}

impl GuardRunContext {
    pub fn new(
        node: Arc<Node>,
        runner: Arc<dyn ProcessRunner>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: &dyn IdProvider,
    ) -> Self {
        Self {
            run_id: id_provider.generate_id(),
            node,
            runner,
            time_provider,
            events: EventSink::default(),
            units: HashSet::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(String::as_str)
    }

    fn register(&mut self, unit: &ScriptUnit) -> Result<()> {
        if !self.units.insert(unit.name().to_string()) {
            return Err(GuardError::DuplicateUnit(unit.name().to_string()));
        }
        Ok(())
    }

    /// Run `unit` with `strategy` inside this context
    ///
    /// # Errors
    /// - GuardError::ExecutionUnavailable if the process cannot be attempted
    /// - Strategy errors (e.g. ArchitectureUnsupported) unchanged
    pub async fn run_unit(
        &mut self,
        unit: &ScriptUnit,
        strategy: &dyn GuardStrategy,
    ) -> Result<UnitOutcome> {
        self.register(unit)?;
        let spec = strategy.build_invocation(unit, &self.node)?;

        let started_at = self.time_provider.now_millis();
        self.events.emit(GuardEvent::UnitStarted {
            unit: unit.name().to_string(),
            at_ms: started_at,
        });
        info!(
            run_id = %self.run_id,
            unit = %unit.name(),
            program = %spec.program,
            cwd = ?spec.cwd,
            user = ?spec.user,
            timeout = ?spec.timeout,
            "Running guard unit"
        );

        match self.runner.run(&spec).await {
            Ok(result) => {
                let duration_ms = result.duration_ms;
                let outcome = match result.exit_code {
                    Some(code) if unit.is_expected_exit(code) => {
                        UnitOutcome::Succeeded { exit_code: code }
                    }
                    exit_code => UnitOutcome::Failed { exit_code },
                };

                match &outcome {
                    UnitOutcome::Succeeded { exit_code } => {
                        self.events.emit(GuardEvent::UnitSucceeded {
                            unit: unit.name().to_string(),
                            exit_code: *exit_code,
                            duration_ms,
                        })
                    }
                    UnitOutcome::Failed { exit_code } => self.events.emit(GuardEvent::UnitFailed {
                        unit: unit.name().to_string(),
                        exit_code: *exit_code,
                        duration_ms,
                    }),
                }
                info!(
                    run_id = %self.run_id,
                    unit = %unit.name(),
                    exit_code = ?result.exit_code,
                    duration_ms = %duration_ms,
                    succeeded = outcome.is_success(),
                    "Guard unit finished"
                );
                Ok(outcome)
            }
            Err(ExecutionError::Timeout(timeout_ms)) => {
                warn!(
                    run_id = %self.run_id,
                    unit = %unit.name(),
                    timeout_ms = %timeout_ms,
                    "Guard unit timed out, treating as failed"
                );
                self.events.emit(GuardEvent::UnitTimedOut {
                    unit: unit.name().to_string(),
                    timeout_ms,
                });
                Ok(UnitOutcome::Failed { exit_code: None })
            }
            Err(source) => {
                self.events.emit(GuardEvent::UnitErrored {
                    unit: unit.name().to_string(),
                    reason: source.to_string(),
                });
                Err(GuardError::ExecutionUnavailable {
                    unit: unit.name().to_string(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OsKind;
    use crate::port::guard_strategy::mocks::MockStrategy;
    use crate::port::id_provider::UuidProvider;
    use crate::port::process_runner::mocks::{MockBehavior, MockProcessRunner};
    use crate::port::time_provider::FixedTimeProvider;

    fn context(runner: MockProcessRunner) -> GuardRunContext {
        GuardRunContext::new(
            Arc::new(Node::new("n", OsKind::Linux, "ubuntu", "22.04", "x86_64")),
            Arc::new(runner),
            Arc::new(FixedTimeProvider(1_000)),
            &UuidProvider,
        )
    }

    #[tokio::test]
    async fn test_expected_exit_succeeds() {
        let mut ctx = context(MockProcessRunner::exiting(0));
        let unit = ScriptUnit::new("u").code("true");

        let outcome = ctx.run_unit(&unit, &MockStrategy::new("sh")).await.unwrap();
        assert_eq!(outcome, UnitOutcome::Succeeded { exit_code: 0 });
        assert_eq!(ctx.events().len(), 2);
        assert!(matches!(
            ctx.events().events()[0],
            GuardEvent::UnitStarted { at_ms: 1_000, .. }
        ));
    }

    #[tokio::test]
    async fn test_custom_returns() {
        let mut ctx = context(MockProcessRunner::exiting(3));
        let unit = ScriptUnit::new("u").returns(vec![0, 3]);

        let outcome = ctx.run_unit(&unit, &MockStrategy::new("sh")).await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_signal_and_timeout_are_failures() {
        let mut ctx = context(
            MockProcessRunner::exiting(0)
                .then(MockBehavior::Signaled)
                .then(MockBehavior::Timeout(100)),
        );

        let first = ctx
            .run_unit(&ScriptUnit::new("a"), &MockStrategy::new("sh"))
            .await
            .unwrap();
        let second = ctx
            .run_unit(&ScriptUnit::new("b"), &MockStrategy::new("sh"))
            .await
            .unwrap();

        assert_eq!(first, UnitOutcome::Failed { exit_code: None });
        assert_eq!(second, UnitOutcome::Failed { exit_code: None });
        assert!(ctx
            .events()
            .events()
            .iter()
            .any(|e| matches!(e, GuardEvent::UnitTimedOut { timeout_ms: 100, .. })));
    }

    #[tokio::test]
    async fn test_spawn_failure_propagates() {
        let mut ctx = context(MockProcessRunner::new(MockBehavior::SpawnFail(
            "No such file or directory".to_string(),
        )));

        let err = ctx
            .run_unit(&ScriptUnit::new("u"), &MockStrategy::new("sh"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GuardError::ExecutionUnavailable {
                source: ExecutionError::SpawnFailed(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_unit_rejected() {
        let mut ctx = context(MockProcessRunner::exiting(0));
        let unit = ScriptUnit::new("same");

        ctx.run_unit(&unit, &MockStrategy::new("sh")).await.unwrap();
        let err = ctx
            .run_unit(&unit, &MockStrategy::new("sh"))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::DuplicateUnit(name) if name == "same"));
    }
}
