// Node probe implementation
// reason: sysinfo for cross-platform OS facts (ADR-001)
use sysinfo::System;
use tracing::debug;

use scriptguard_core::domain::{Node, OsKind};
use scriptguard_core::port::NodeProbe;

/// Describes the machine the agent runs on
#[derive(Debug, Default)]
pub struct SysinfoNodeProbe;

impl SysinfoNodeProbe {
    pub fn new() -> Self {
        Self
    }

    /// Kernel machine string; a 32-bit agent on 64-bit Windows still reports the node
    fn machine() -> String {
        if cfg!(windows) && std::env::var_os("PROCESSOR_ARCHITEW6432").is_some() {
            return "x86_64".to_string();
        }
        std::env::consts::ARCH.to_string()
    }
}

impl NodeProbe for SysinfoNodeProbe {
    fn describe(&self) -> Node {
        let os = OsKind::current();
        let name = System::host_name().unwrap_or_else(|| "localhost".to_string());
        let platform = match os {
            OsKind::Windows => "windows".to_string(),
            OsKind::MacOs => "mac_os_x".to_string(),
            _ => System::distribution_id().to_ascii_lowercase(),
        };
        let platform_version = System::os_version().unwrap_or_default();

        let node = Node::new(name, os, platform, platform_version, Self::machine());
        debug!(
            node = %node.name,
            os = %node.os,
            platform = %node.platform,
            version = %node.platform_version,
            machine = %node.machine,
            "Local node described"
        );
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_local_node() {
        let node = SysinfoNodeProbe::new().describe();

        assert_eq!(node.os, OsKind::current());
        assert!(!node.name.is_empty());
        assert!(!node.machine.is_empty());
        assert!(!node.platform.is_empty());
    }
}
