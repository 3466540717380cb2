//! Agent graph model: typed nodes connected by directed edges.
//!
//! A workflow is a `Graph` of `Node`s (trigger, action, condition, data)
//! joined by `Edge`s. The `GraphStore` is the mutable editing authority over
//! one graph; `NodeTemplate` is the catalogue of node types the editor offers.

pub mod edge;
pub mod node;
pub mod store;
pub mod template;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use edge::Edge;
pub use node::{HttpMethod, Node, NodeConfig, NodeKind, NodePatch};
pub use store::GraphStore;
pub use template::NodeTemplate;

use crate::types::{EdgeId, NodeId};

/// Nodes plus edges. Node order is kept for rendering only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn contains_edge(&self, id: &EdgeId) -> bool {
        self.edges.iter().any(|e| &e.id == id)
    }

    /// Edges whose target is `id`.
    pub fn incoming<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.target == id)
    }

    /// Edges whose source is `id`.
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| &e.source == id)
    }

    /// Trigger nodes with no incoming edge, where execution starts.
    pub fn entry_points(&self) -> Vec<&Node> {
        let targets: HashSet<&NodeId> = self.edges.iter().map(|e| &e.target).collect();
        self.nodes
            .iter()
            .filter(|n| n.is_trigger() && !targets.contains(&n.id))
            .collect()
    }

    /// First `<prefix>-<n>` id (n >= 1) not used by any node.
    pub fn free_node_id(&self, prefix: &str) -> NodeId {
        let used: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", prefix, n);
            if !used.contains(candidate.as_str()) {
                return NodeId(candidate);
            }
            n += 1;
        }
    }

    /// First `<base>` or `<base>-<n>` edge id not already in use.
    pub fn free_edge_id(&self, base: &str) -> EdgeId {
        let used: HashSet<&str> = self.edges.iter().map(|e| e.id.as_str()).collect();
        if !used.contains(base) {
            return EdgeId(base.to_string());
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !used.contains(candidate.as_str()) {
                return EdgeId(candidate);
            }
            n += 1;
        }
    }
}
