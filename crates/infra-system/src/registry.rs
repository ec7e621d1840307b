// Default strategy registrations for the interpreters shipped with the agent

use std::sync::Arc;

use scriptguard_core::application::{
    BashInterpreter, BatchInterpreter, GuardInterpreter, PowerShellInterpreter, ShellInterpreter,
    StrategyKey, StrategyRegistry,
};
use scriptguard_core::domain::OsKind;
use scriptguard_core::port::GuardStrategy;

use crate::strategies::{Bash, Batch, PosixShell, PowerShell};

const POSIX_OS_KINDS: [OsKind; 3] = [OsKind::Linux, OsKind::MacOs, OsKind::FreeBsd];

/// Register the built-in strategies into `registry`
pub fn register_defaults(registry: &mut StrategyRegistry) {
    for os in POSIX_OS_KINDS {
        registry
            .register(StrategyKey::os(os, ShellInterpreter::IDENTIFIER), || {
                Arc::new(PosixShell::new()) as Arc<dyn GuardStrategy>
            })
            .register(StrategyKey::os(os, BashInterpreter::IDENTIFIER), || {
                Arc::new(Bash::new()) as Arc<dyn GuardStrategy>
            });
    }

    registry
        .register(
            StrategyKey::os(OsKind::Windows, PowerShellInterpreter::IDENTIFIER),
            || Arc::new(PowerShell::new()) as Arc<dyn GuardStrategy>,
        )
        .register(
            StrategyKey::os(OsKind::Windows, BatchInterpreter::IDENTIFIER),
            || Arc::new(Batch::new()) as Arc<dyn GuardStrategy>,
        );
}

/// Registry holding only the built-in strategies
pub fn default_registry() -> StrategyRegistry {
    let mut registry = StrategyRegistry::new();
    register_defaults(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptguard_core::domain::{GuardStrategyId, Node};

    #[test]
    fn test_default_registrations() {
        let registry = default_registry();
        assert_eq!(registry.len(), 8);

        let mac = Node::new("m", OsKind::MacOs, "mac_os_x", "14.2", "x86_64");
        let factory = registry
            .lookup(&mac, &GuardStrategyId::new("script"))
            .unwrap();
        assert_eq!(factory().name(), "script");

        let windows = Node::new("w", OsKind::Windows, "windows", "10.0.19045", "x86_64");
        let factory = registry
            .lookup(&windows, &GuardStrategyId::new("powershell_script"))
            .unwrap();
        assert_eq!(factory().name(), "powershell_script");

        assert!(registry
            .lookup(&windows, &GuardStrategyId::new("script"))
            .is_none());
        assert!(registry
            .lookup(&mac, &GuardStrategyId::new("powershell_script"))
            .is_none());
    }
}
