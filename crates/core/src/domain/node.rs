// Node descriptor - read-only facts about the target platform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::DomainError;

/// Operating system kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsKind {
    Linux,
    MacOs,
    FreeBsd,
    Windows,
    Other,
}

impl OsKind {
    /// OS kind the agent itself was built for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsKind::Windows
        } else if cfg!(target_os = "linux") {
            OsKind::Linux
        } else if cfg!(target_os = "macos") {
            OsKind::MacOs
        } else if cfg!(target_os = "freebsd") {
            OsKind::FreeBsd
        } else {
            OsKind::Other
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, OsKind::Windows)
    }
}

impl fmt::Display for OsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsKind::Linux => write!(f, "linux"),
            OsKind::MacOs => write!(f, "mac_os"),
            OsKind::FreeBsd => write!(f, "freebsd"),
            OsKind::Windows => write!(f, "windows"),
            OsKind::Other => write!(f, "other"),
        }
    }
}

impl FromStr for OsKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linux" => Ok(OsKind::Linux),
            "mac_os" | "macos" | "darwin" => Ok(OsKind::MacOs),
            "freebsd" => Ok(OsKind::FreeBsd),
            "windows" => Ok(OsKind::Windows),
            "other" => Ok(OsKind::Other),
            _ => Err(DomainError::InvalidOsKind(s.to_string())),
        }
    }
}

/// Word size a guard command may be evaluated under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    I386,
    X86_64,
}

impl Architecture {
    /// Architecture of the running agent process
    pub fn of_current_process() -> Self {
        if cfg!(target_pointer_width = "64") {
            Architecture::X86_64
        } else {
            Architecture::I386
        }
    }

    /// Value Windows exposes as `PROCESSOR_ARCHITECTURE` to a process of this word size
    pub fn processor_marker(&self) -> &'static str {
        match self {
            Architecture::I386 => "X86",
            Architecture::X86_64 => "AMD64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::I386 => write!(f, "i386"),
            Architecture::X86_64 => write!(f, "x86_64"),
        }
    }
}

impl FromStr for Architecture {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "i386" | "i686" | "x86" => Ok(Architecture::I386),
            "x86_64" | "amd64" | "x64" => Ok(Architecture::X86_64),
            _ => Err(DomainError::InvalidArchitecture(s.to_string())),
        }
    }
}

/// Target platform description (owned by the caller, consumed read-only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub os: OsKind,
    /// Platform name, e.g. "ubuntu", "windows", "mac_os_x"
    pub platform: String,
    pub platform_version: String,
    /// Kernel machine string, e.g. "x86_64", "i686", "aarch64"
    pub machine: String,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        os: OsKind,
        platform: impl Into<String>,
        platform_version: impl Into<String>,
        machine: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            os,
            platform: platform.into(),
            platform_version: platform_version.into(),
            machine: machine.into(),
        }
    }

    /// Machine is a 64-bit x86 processor
    pub fn is_x86_64(&self) -> bool {
        matches!(
            self.machine.to_ascii_lowercase().as_str(),
            "x86_64" | "amd64" | "x64"
        )
    }

    fn is_x86_32(&self) -> bool {
        matches!(
            self.machine.to_ascii_lowercase().as_str(),
            "i386" | "i486" | "i586" | "i686" | "x86"
        )
    }

    /// Whether a process of the given word size can run on this node
    pub fn supports_architecture(&self, architecture: Architecture) -> bool {
        match architecture {
            Architecture::X86_64 => self.is_x86_64(),
            Architecture::I386 => self.is_x86_64() || self.is_x86_32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_architecture_parsing() {
        assert_eq!("x86_64".parse::<Architecture>().unwrap(), Architecture::X86_64);
        assert_eq!("AMD64".parse::<Architecture>().unwrap(), Architecture::X86_64);
        assert_eq!("i686".parse::<Architecture>().unwrap(), Architecture::I386);
        assert!("sparc".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_supports_architecture() {
        let node64 = Node::new("n", OsKind::Windows, "windows", "6.3.9600", "x86_64");
        assert!(node64.supports_architecture(Architecture::X86_64));
        assert!(node64.supports_architecture(Architecture::I386));

        let node32 = Node::new("n", OsKind::Windows, "windows", "6.1.7601", "i686");
        assert!(!node32.supports_architecture(Architecture::X86_64));
        assert!(node32.supports_architecture(Architecture::I386));

        let arm = Node::new("n", OsKind::Linux, "ubuntu", "22.04", "aarch64");
        assert!(!arm.supports_architecture(Architecture::I386));
    }

    #[test]
    fn test_node_json_shape() {
        let node: Node = serde_json::from_value(serde_json::json!({
            "name": "web01",
            "os": "linux",
            "platform": "ubuntu",
            "platform_version": "22.04",
            "machine": "x86_64"
        }))
        .unwrap();

        assert_eq!(node.os, OsKind::Linux);
        assert_eq!(node.platform, "ubuntu");
    }
}
