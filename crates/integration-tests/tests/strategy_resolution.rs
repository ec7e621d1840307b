//! Strategy resolution with the built-in registry

use std::sync::Arc;

use scriptguard_core::application::{
    GuardDeclarations, GuardRuntime, GuardStrategyResolver, StrategyKey,
};
use scriptguard_core::domain::{
    Architecture, GuardStrategyId, HasArchitecture, Node, OsKind, ParentResource, VersionRange,
};
use scriptguard_core::port::process_runner::mocks::MockProcessRunner;
use scriptguard_core::port::GuardStrategy;
use scriptguard_core::GuardError;
use scriptguard_infra_system::{default_registry, register_defaults, PosixShell};

struct PowershellScript {
    node: Node,
    architecture: Option<Architecture>,
}

impl HasArchitecture for PowershellScript {
    fn architecture(&self) -> Option<Architecture> {
        self.architecture
    }
}

impl ParentResource for PowershellScript {
    fn name(&self) -> &str {
        "powershell_script[PowershellGuard functional test]"
    }
    fn node(&self) -> &Node {
        &self.node
    }
    fn as_has_architecture(&self) -> Option<&dyn HasArchitecture> {
        Some(self)
    }
}

fn resolver() -> GuardStrategyResolver {
    GuardStrategyResolver::new(Arc::new(default_registry()))
}

fn windows() -> Node {
    serde_json::from_value(serde_json::json!({
        "name": "win2012",
        "os": "windows",
        "platform": "windows",
        "platform_version": "6.3.9600",
        "machine": "x86_64"
    }))
    .unwrap()
}

fn linux() -> Node {
    Node::new("web01", OsKind::Linux, "debian", "12", "x86_64")
}

#[test]
fn test_builtin_identifiers_per_os() {
    let resolver = resolver();

    for (node, identifier) in [
        (linux(), "script"),
        (linux(), "bash"),
        (windows(), "powershell_script"),
        (windows(), "batch"),
    ] {
        let strategy = resolver
            .resolve(&node, &GuardStrategyId::new(identifier))
            .unwrap();
        assert_eq!(strategy.name(), identifier);
    }
}

#[test]
fn test_unregistered_pairs_never_default() {
    let resolver = resolver();

    for (node, identifier) in [
        (linux(), "powershell_script"),
        (linux(), "batch"),
        (windows(), "script"),
        (windows(), "ruby"),
    ] {
        let err = resolver
            .resolve(&node, &GuardStrategyId::new(identifier))
            .unwrap_err();
        assert!(
            matches!(err, GuardError::UnsupportedPlatform { .. }),
            "{} on {} should be unsupported",
            identifier,
            node.os
        );
    }

    let other = Node::new("x", OsKind::Other, "plan9", "4", "x86_64");
    assert!(resolver
        .resolve(&other, &GuardStrategyId::new("script"))
        .is_err());
}

#[test]
fn test_powershell_extension_on_windows_node() {
    let runtime = GuardRuntime::new(resolver(), Arc::new(MockProcessRunner::exiting(0)));
    let resource = PowershellScript {
        node: windows(),
        architecture: Some(Architecture::X86_64),
    };

    let guard = resource
        .powershell(&runtime, Some("exit 0"))
        .unwrap()
        .unwrap();

    assert_eq!(guard.architecture(), Some(Architecture::X86_64));
    assert_eq!(
        guard.unit_name(),
        "scriptguard-powershell_script-powershell_script[PowershellGuard functional test]"
    );
    assert!(resource.powershell(&runtime, None).unwrap().is_none());
}

#[tokio::test]
async fn test_powershell_guard_invocation_through_mock_runner() {
    let runner = Arc::new(MockProcessRunner::exiting(37));
    let runtime = GuardRuntime::new(resolver(), runner.clone());
    let resource = PowershellScript {
        node: windows(),
        architecture: Some(Architecture::I386),
    };

    let mut guard = resource
        .powershell(&runtime, Some("exit 37"))
        .unwrap()
        .unwrap();
    let passed = guard
        .run_command(&scriptguard_core::domain::ExecutionOptions::new())
        .await
        .unwrap();

    assert!(!passed);
    let spec = runner.last_call().unwrap();
    assert!(spec.program.ends_with(r"\WindowsPowerShell\v1.0\powershell.exe"));
    assert!(spec.args.last().unwrap().contains("exit 37"));
}

#[test]
fn test_powershell_extension_on_linux_node_fails_fast() {
    let runtime = GuardRuntime::new(resolver(), Arc::new(MockProcessRunner::exiting(0)));
    let resource = PowershellScript {
        node: linux(),
        architecture: None,
    };

    let err = resource.powershell(&runtime, Some("exit 0")).unwrap_err();
    assert!(matches!(err, GuardError::UnsupportedPlatform { .. }));
}

#[test]
fn test_platform_override_takes_precedence() {
    let mut registry = scriptguard_core::application::StrategyRegistry::new();
    register_defaults(&mut registry);
    registry.register(
        StrategyKey::os(OsKind::Linux, "script")
            .platform("alpine")
            .versions(VersionRange::at_least("3.0")),
        || Arc::new(PosixShell::with_interpreter("/bin/ash")) as Arc<dyn GuardStrategy>,
    );
    let resolver = GuardStrategyResolver::new(Arc::new(registry));

    let alpine = Node::new("a", OsKind::Linux, "alpine", "3.19", "x86_64");
    let spec = resolver
        .resolve(&alpine, &GuardStrategyId::new("script"))
        .unwrap()
        .build_invocation(
            &scriptguard_core::domain::ScriptUnit::new("u").code("true"),
            &alpine,
        )
        .unwrap();
    assert_eq!(spec.program, "/bin/ash");

    let spec = resolver
        .resolve(&linux(), &GuardStrategyId::new("script"))
        .unwrap()
        .build_invocation(
            &scriptguard_core::domain::ScriptUnit::new("u").code("true"),
            &linux(),
        )
        .unwrap();
    assert_eq!(spec.program, "/bin/sh");
}
