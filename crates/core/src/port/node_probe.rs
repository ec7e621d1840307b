// Node probe port - describes the local machine as a Node

use crate::domain::Node;

/// Source of the node descriptor when the caller does not supply one
pub trait NodeProbe: Send + Sync {
    fn describe(&self) -> Node;
}

pub mod mocks {
    use super::*;

    /// Returns a fixed descriptor
    pub struct StaticNodeProbe(pub Node);

    impl NodeProbe for StaticNodeProbe {
        fn describe(&self) -> Node {
            self.0.clone()
        }
    }
}
