// Process Runner Port
// Abstraction for spawning the interpreter process behind a guard unit

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::domain::ScriptUnit;

/// Fully resolved process invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment
    pub env: HashMap<String, String>,
    pub cwd: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub timeout: Option<Duration>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Invocation of `program args...` carrying the unit's execution context
    pub fn for_unit(unit: &ScriptUnit, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: unit.env().clone(),
            cwd: unit.working_dir().map(str::to_string),
            user: unit.run_as_user().map(str::to_string),
            group: unit.run_as_group().map(str::to_string),
            timeout: unit.time_limit(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Result of a completed process
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

/// Execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
    Killed,
}

/// Execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process timeout after {0}ms")]
    Timeout(i64),

    #[error("Process could not be terminated: {0}")]
    Killed(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns a real child process
/// - MockProcessRunner: scripted outcomes for tests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a process to completion
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the program cannot be started
    /// - ExecutionError::Timeout if it exceeds `spec.timeout` (the process is terminated)
    /// - ExecutionError::InvalidIdentity if user/group cannot be resolved
    async fn run(&self, spec: &ProcessSpec) -> Result<ExecutionResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Mock runner behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit with the given status code
        Exit(i32),
        /// Terminated by a signal (no exit code)
        Signaled,
        /// Exceed the time limit
        Timeout(i64),
        /// Fail before the process starts
        SpawnFail(String),
    }

    /// Mock Process Runner for testing
    ///
    /// Behaviors queued with `then` are consumed first; afterwards the
    /// default behavior repeats.
    pub struct MockProcessRunner {
        default: MockBehavior,
        queued: Arc<Mutex<VecDeque<MockBehavior>>>,
        calls: Arc<Mutex<Vec<ProcessSpec>>>,
    }

    impl MockProcessRunner {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                default: behavior,
                queued: Arc::new(Mutex::new(VecDeque::new())),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
        pub fn exiting(code: i32) -> Self {
            Self::new(MockBehavior::Exit(code))
        }
        pub fn then(self, behavior: MockBehavior) -> Self {
            self.queued.lock().unwrap().push_back(behavior);
            self
        }
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
        pub fn calls(&self) -> Vec<ProcessSpec> {
            self.calls.lock().unwrap().clone()
        }
        pub fn last_call(&self) -> Option<ProcessSpec> {
            self.calls.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run(&self, spec: &ProcessSpec) -> Result<ExecutionResult, ExecutionError> {
            self.calls.lock().unwrap().push(spec.clone());

            let behavior = self
                .queued
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default.clone());

            match behavior {
                MockBehavior::Exit(code) => Ok(ExecutionResult {
                    status: if code == 0 {
                        ExecutionStatus::Success
                    } else {
                        ExecutionStatus::Failed
                    },
                    duration_ms: 5,
                    exit_code: Some(code),
                    stdout: Some(String::new()),
                    stderr: Some(String::new()),
                }),
                MockBehavior::Signaled => Ok(ExecutionResult {
                    status: ExecutionStatus::Killed,
                    duration_ms: 5,
                    exit_code: None,
                    stdout: None,
                    stderr: None,
                }),
                MockBehavior::Timeout(ms) => Err(ExecutionError::Timeout(ms)),
                MockBehavior::SpawnFail(msg) => Err(ExecutionError::SpawnFailed(msg)),
            }
        }
    }
}
