// Guard Strategy Port
// A platform-specific way of turning a script unit into a process invocation

use std::fmt;

use crate::domain::{Node, ScriptUnit};
use crate::error::{GuardError, Result};
use crate::port::ProcessSpec;

/// Execution strategy for one kind of interpreter
pub trait GuardStrategy: Send + Sync + fmt::Debug {
    /// Strategy type name; part of every guard unit name
    fn name(&self) -> &str;

    /// Build the process invocation for `unit` on `node`
    ///
    /// # Errors
    /// - GuardError::ArchitectureUnsupported if the unit pins a word size the node lacks
    fn build_invocation(&self, unit: &ScriptUnit, node: &Node) -> Result<ProcessSpec>;
}

/// Reject units pinned to an architecture the node cannot run
pub fn ensure_architecture(unit: &ScriptUnit, node: &Node) -> Result<()> {
    match unit.target_architecture() {
        Some(requested) if !node.supports_architecture(requested) => {
            Err(GuardError::ArchitectureUnsupported {
                requested,
                machine: node.machine.clone(),
            })
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Strategy that runs `<name> <code>` and validates architecture only
    #[derive(Debug, Clone)]
    pub struct MockStrategy {
        name: String,
    }

    impl MockStrategy {
        pub fn new(name: impl Into<String>) -> Self {
            Self { name: name.into() }
        }
    }

    impl GuardStrategy for MockStrategy {
        fn name(&self) -> &str {
            &self.name
        }

        fn build_invocation(&self, unit: &ScriptUnit, node: &Node) -> Result<ProcessSpec> {
            ensure_architecture(unit, node)?;
            Ok(ProcessSpec::for_unit(
                unit,
                self.name.clone(),
                vec![unit.command().to_string()],
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Architecture, OsKind};

    #[test]
    fn test_ensure_architecture() {
        let node32 = Node::new("n", OsKind::Windows, "windows", "6.1", "i686");
        let unit = ScriptUnit::new("u").architecture(Architecture::X86_64);

        let err = ensure_architecture(&unit, &node32).unwrap_err();
        assert!(matches!(
            err,
            GuardError::ArchitectureUnsupported {
                requested: Architecture::X86_64,
                ..
            }
        ));

        assert!(ensure_architecture(&ScriptUnit::new("u"), &node32).is_ok());
    }
}
