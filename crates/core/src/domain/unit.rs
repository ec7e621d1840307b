// Script execution unit - the disposable "run this command" object

use std::collections::HashMap;
use std::time::Duration;

use super::node::Architecture;
use super::options::ExecutionOptions;

/// One command run, as handed to a strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptUnit {
    name: String,
    code: String,
    architecture: Option<Architecture>,
    returns: Vec<i32>,
    user: Option<String>,
    group: Option<String>,
    cwd: Option<String>,
    environment: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl ScriptUnit {
    /// New unit expecting exit status 0 unless told otherwise
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: String::new(),
            architecture: None,
            returns: vec![0],
            user: None,
            group: None,
            cwd: None,
            environment: HashMap::new(),
            timeout: None,
        }
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    pub fn architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    pub fn returns(mut self, codes: impl Into<Vec<i32>>) -> Self {
        self.returns = codes.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Apply every present option; absent ones keep their current value
    pub fn apply_options(mut self, options: &ExecutionOptions) -> Self {
        if let Some(user) = &options.user {
            self = self.user(user.clone());
        }
        if let Some(cwd) = &options.cwd {
            self = self.cwd(cwd.clone());
        }
        if let Some(group) = &options.group {
            self = self.group(group.clone());
        }
        if let Some(environment) = &options.environment {
            self = self.environment(environment.clone());
        }
        if let Some(timeout) = options.timeout {
            self = self.timeout(timeout);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.code
    }

    pub fn target_architecture(&self) -> Option<Architecture> {
        self.architecture
    }

    pub fn expected_exit_codes(&self) -> &[i32] {
        &self.returns
    }

    pub fn run_as_user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn run_as_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.environment
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_expected_exit(&self, exit_code: i32) -> bool {
        self.returns.contains(&exit_code)
    }
}
