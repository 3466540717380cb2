use serde::{Deserialize, Serialize};

use crate::types::{EdgeId, NodeId};

/// A directed connection: the source node's completion feeds the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
}

impl Edge {
    /// Create an edge with the conventional `e-<source>-<target>` id.
    pub fn connect(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: EdgeId(format!("e-{}-{}", source, target)),
            source,
            target,
        }
    }

    /// Create an edge with an explicit id.
    pub fn with_id(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
        }
    }

    /// Whether this edge starts or ends at `node`.
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_builders() {
        let e = Edge::connect("trigger-1", "action-email");
        assert_eq!(e.id.as_str(), "e-trigger-1-action-email");
        assert_eq!(e.source.as_str(), "trigger-1");
        assert_eq!(e.target.as_str(), "action-email");

        let e = Edge::with_id("custom", "a", "b");
        assert_eq!(e.id.as_str(), "custom");
    }

    #[test]
    fn test_touches_and_self_loop() {
        let e = Edge::connect("a", "b");
        assert!(e.touches(&NodeId::from("a")));
        assert!(e.touches(&NodeId::from("b")));
        assert!(!e.touches(&NodeId::from("c")));
        assert!(!e.is_self_loop());
        assert!(Edge::connect("a", "a").is_self_loop());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let edge = Edge::connect("a", "b");
        let json = serde_json::to_string(&edge).unwrap();
        assert!(json.contains("\"source\":\"a\""));
        let parsed: Edge = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, edge);
    }
}
