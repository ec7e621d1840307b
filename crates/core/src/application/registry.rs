// Execution-strategy registry
// (os, platform?, version range, identifier) -> strategy factory

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{GuardStrategyId, Node, OsKind, VersionRange};
use crate::port::GuardStrategy;

/// Produces a fresh strategy instance
pub type StrategyFactory = Arc<dyn Fn() -> Arc<dyn GuardStrategy> + Send + Sync>;

/// Registration key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyKey {
    pub os: OsKind,
    /// Exact platform name; None matches every platform of `os`
    pub platform: Option<String>,
    pub versions: VersionRange,
    pub identifier: GuardStrategyId,
}

impl StrategyKey {
    /// Key covering every platform and version of an OS
    pub fn os(os: OsKind, identifier: impl Into<GuardStrategyId>) -> Self {
        Self {
            os,
            platform: None,
            versions: VersionRange::any(),
            identifier: identifier.into(),
        }
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn versions(mut self, versions: VersionRange) -> Self {
        self.versions = versions;
        self
    }

    fn matches(&self, node: &Node, identifier: &GuardStrategyId) -> bool {
        self.identifier == *identifier
            && self.os == node.os
            && self
                .platform
                .as_deref()
                .map_or(true, |p| p.eq_ignore_ascii_case(&node.platform))
            && self.versions.contains(&node.platform_version)
    }

    /// Exact platform beats OS-wide, bounded versions beat unbounded
    fn specificity(&self) -> (bool, bool) {
        (self.platform.is_some(), self.versions.is_bounded())
    }
}

struct Registration {
    key: StrategyKey,
    factory: StrategyFactory,
}

/// Process-wide table of strategies, populated at startup and read afterwards
#[derive(Default)]
pub struct StrategyRegistry {
    registrations: Vec<Registration>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `key`
    pub fn register<F>(&mut self, key: StrategyKey, factory: F) -> &mut Self
    where
        F: Fn() -> Arc<dyn GuardStrategy> + Send + Sync + 'static,
    {
        self.registrations.push(Registration {
            key,
            factory: Arc::new(factory),
        });
        self
    }

    /// Most specific factory for (node, identifier); later registrations win ties
    pub fn lookup(&self, node: &Node, identifier: &GuardStrategyId) -> Option<StrategyFactory> {
        let found = self
            .registrations
            .iter()
            .enumerate()
            .filter(|(_, r)| r.key.matches(node, identifier))
            .max_by_key(|(seq, r)| (r.key.specificity(), *seq))
            .map(|(_, r)| r);

        debug!(
            os = %node.os,
            platform = %node.platform,
            version = %node.platform_version,
            identifier = %identifier,
            found = found.is_some(),
            "Strategy registry lookup"
        );

        found.map(|r| r.factory.clone())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.registrations.iter().map(|r| &r.key))
            .finish()
    }
}
