// Guard strategy resolution

use std::sync::Arc;
use tracing::debug;

use super::registry::StrategyRegistry;
use crate::domain::{GuardStrategyId, Node};
use crate::error::{GuardError, Result};
use crate::port::GuardStrategy;

/// Resolves a logical interpreter identifier to the strategy registered for a node
#[derive(Debug, Clone)]
pub struct GuardStrategyResolver {
    registry: Arc<StrategyRegistry>,
}

impl GuardStrategyResolver {
    pub fn new(registry: Arc<StrategyRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve `identifier` for `node`
    ///
    /// # Errors
    /// - GuardError::UnsupportedPlatform if nothing is registered; never falls back
    pub fn resolve(
        &self,
        node: &Node,
        identifier: &GuardStrategyId,
    ) -> Result<Arc<dyn GuardStrategy>> {
        let factory = self.registry.lookup(node, identifier).ok_or_else(|| {
            GuardError::UnsupportedPlatform {
                os: node.os,
                platform: node.platform.clone(),
                version: node.platform_version.clone(),
                identifier: identifier.clone(),
            }
        })?;

        let strategy = factory();
        debug!(
            identifier = %identifier,
            strategy = %strategy.name(),
            node = %node.name,
            "Guard strategy resolved"
        );
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::StrategyKey;
    use crate::domain::OsKind;
    use crate::port::guard_strategy::mocks::MockStrategy;

    fn resolver() -> GuardStrategyResolver {
        let mut registry = StrategyRegistry::new();
        registry.register(StrategyKey::os(OsKind::Linux, "script"), || {
            Arc::new(MockStrategy::new("script")) as Arc<dyn GuardStrategy>
        });
        GuardStrategyResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = resolver();
        let node = Node::new("n", OsKind::Linux, "debian", "12", "x86_64");
        let id = GuardStrategyId::new("script");

        let first = resolver.resolve(&node, &id).unwrap();
        let second = resolver.resolve(&node, &id).unwrap();
        assert_eq!(first.name(), second.name());
    }

    #[test]
    fn test_unregistered_pair_is_unsupported() {
        let resolver = resolver();
        let node = Node::new("n", OsKind::Linux, "debian", "12", "x86_64");

        let err = resolver
            .resolve(&node, &GuardStrategyId::new("powershell_script"))
            .unwrap_err();

        match err {
            GuardError::UnsupportedPlatform {
                os, identifier, ..
            } => {
                assert_eq!(os, OsKind::Linux);
                assert_eq!(identifier.as_str(), "powershell_script");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
