// Per-invocation execution options for a guard command

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::error::{DomainError, Result};

/// Options applied to one guard invocation.
/// Absent fields leave the strategy defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOptions {
    pub user: Option<String>,
    pub cwd: Option<String>,
    pub group: Option<String>,
    pub environment: Option<HashMap<String, String>>,
    pub timeout: Option<Duration>,
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Add a single variable, creating the mapping if needed
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parse a `KEY=VALUE` pair (command-line style environment entry)
pub fn parse_env_entry(entry: &str) -> Result<(String, String)> {
    match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(DomainError::InvalidEnvironmentEntry(entry.to_string())),
    }
}
