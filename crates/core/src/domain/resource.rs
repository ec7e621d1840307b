// Parent resource capabilities and strategy identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use super::node::{Architecture, Node};

/// Logical interpreter name ("script", "powershell_script", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuardStrategyId(String);

impl GuardStrategyId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GuardStrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GuardStrategyId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resources that can pin the word size their commands run under
pub trait HasArchitecture {
    fn architecture(&self) -> Option<Architecture>;
}

/// The resource a guard is declared on
pub trait ParentResource {
    /// Display name, unique among resources of one run
    fn name(&self) -> &str;

    fn node(&self) -> &Node;

    /// Capability query; resources without an architecture concept keep the default
    fn as_has_architecture(&self) -> Option<&dyn HasArchitecture> {
        None
    }
}

/// Architecture of the parent resource, if it has that capability and sets one
pub fn architecture_of<R: ParentResource + ?Sized>(resource: &R) -> Option<Architecture> {
    resource
        .as_has_architecture()
        .and_then(|capable| capable.architecture())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node::OsKind;

    struct Package {
        node: Node,
    }

    impl ParentResource for Package {
        fn name(&self) -> &str {
            "package[nginx]"
        }
        fn node(&self) -> &Node {
            &self.node
        }
    }

    struct Script {
        node: Node,
        architecture: Option<Architecture>,
    }

    impl HasArchitecture for Script {
        fn architecture(&self) -> Option<Architecture> {
            self.architecture
        }
    }

    impl ParentResource for Script {
        fn name(&self) -> &str {
            "powershell_script[setup]"
        }
        fn node(&self) -> &Node {
            &self.node
        }
        fn as_has_architecture(&self) -> Option<&dyn HasArchitecture> {
            Some(self)
        }
    }

    fn node() -> Node {
        Node::new("n", OsKind::Windows, "windows", "6.3", "x86_64")
    }

    #[test]
    fn test_architecture_capability() {
        let package = Package { node: node() };
        assert_eq!(architecture_of(&package), None);

        let script = Script {
            node: node(),
            architecture: Some(Architecture::I386),
        };
        assert_eq!(architecture_of(&script), Some(Architecture::I386));

        let unset = Script {
            node: node(),
            architecture: None,
        };
        assert_eq!(architecture_of(&unset), None);
    }
}
