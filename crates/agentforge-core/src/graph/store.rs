use tracing::{debug, warn};

use crate::types::{EdgeId, NodeId, Position};

use super::edge::Edge;
use super::node::{Node, NodeKind, NodePatch};
use super::template::NodeTemplate;
use super::Graph;

/// Mutable authority over the graph currently being edited.
///
/// Owned by whoever drives the editor and passed by reference to the parts
/// that need it. Mutations never fail: dangling edges may exist transiently
/// and are caught by validation before the graph is saved or run.
///
/// Ids are unique by construction: a node or edge added with an id that is
/// already taken is rekeyed to the next free id, and the final id returned.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graph: Graph,
    selected: Option<NodeId>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an existing graph.
    pub fn from_graph(graph: Graph) -> Self {
        let mut store = Self::new();
        store.load(graph);
        store
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn nodes(&self) -> &[Node] {
        &self.graph.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.graph.edges
    }

    /// Copy of the current graph.
    pub fn snapshot(&self) -> Graph {
        self.graph.clone()
    }

    /// Next sequential id for a node of `kind` (`action-1`, `action-2`, ...).
    pub fn next_node_id(&self, kind: NodeKind) -> NodeId {
        self.graph.free_node_id(kind.id_prefix())
    }

    /// Append a node, rekeying it if its id is already taken.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        if self.graph.contains_node(&node.id) {
            let fresh = self.next_node_id(node.kind());
            warn!(requested = %node.id, assigned = %fresh, "Node id already in use, rekeyed");
            node.id = fresh;
        }
        debug!(node_id = %node.id, kind = %node.kind(), "Node added");
        let id = node.id.clone();
        self.graph.nodes.push(node);
        id
    }

    /// Drop a fresh node of `template` at the given position.
    pub fn add_from_template(&mut self, template: NodeTemplate, x: f64, y: f64) -> NodeId {
        let id = self.next_node_id(template.kind());
        self.add_node(template.instantiate(id, x, y))
    }

    /// Merge `patch` into the node's fields.
    ///
    /// Returns `false` without changing anything if the node does not exist
    /// or the patch would change the node's kind.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> bool {
        let Some(node) = self.graph.nodes.iter_mut().find(|n| &n.id == id) else {
            debug!(node_id = %id, "Update for unknown node ignored");
            return false;
        };
        if !patch.keeps_kind_of(node) {
            warn!(node_id = %id, kind = %node.kind(), "Patch would change node kind, refused");
            return false;
        }
        patch.apply(node);
        true
    }

    /// Move a node. Presentation only.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> bool {
        self.update_node(
            id,
            NodePatch {
                position: Some(position),
                ..NodePatch::default()
            },
        )
    }

    /// Remove a node together with every edge touching it.
    ///
    /// Clears the selection if it pointed at the removed node.
    pub fn delete_node(&mut self, id: &NodeId) -> Option<Node> {
        let index = self.graph.nodes.iter().position(|n| &n.id == id)?;
        let node = self.graph.nodes.remove(index);

        let before = self.graph.edges.len();
        self.graph.edges.retain(|e| !e.touches(id));
        debug!(
            node_id = %id,
            edges_removed = before - self.graph.edges.len(),
            "Node deleted"
        );

        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(node)
    }

    /// Append an edge. Endpoints are not checked here.
    pub fn add_edge(&mut self, mut edge: Edge) -> EdgeId {
        if self.graph.contains_edge(&edge.id) {
            let fresh = self.graph.free_edge_id(edge.id.as_str());
            warn!(requested = %edge.id, assigned = %fresh, "Edge id already in use, rekeyed");
            edge.id = fresh;
        }
        let id = edge.id.clone();
        self.graph.edges.push(edge);
        id
    }

    /// Connect two nodes with a conventionally named edge.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> EdgeId {
        self.add_edge(Edge::connect(source.clone(), target.clone()))
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> Option<Edge> {
        let index = self.graph.edges.iter().position(|e| &e.id == id)?;
        Some(self.graph.edges.remove(index))
    }

    /// Set (or clear) the node under property editing. No effect on the graph.
    pub fn set_selected_node(&mut self, id: Option<NodeId>) {
        self.selected = id;
    }

    /// The selected node, if it still exists.
    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.as_ref().and_then(|id| self.graph.node(id))
    }

    /// Replace all nodes. Used when loading a persisted graph.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.graph.nodes = nodes;
    }

    /// Replace all edges. Used when loading a persisted graph.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.graph.edges = edges;
    }

    /// Replace the whole graph and clear the selection.
    pub fn load(&mut self, graph: Graph) {
        self.set_nodes(graph.nodes);
        self.set_edges(graph.edges);
        self.selected = None;
    }

    /// Reset to an empty graph and clear the selection.
    pub fn clear_canvas(&mut self) {
        self.graph = Graph::default();
        self.selected = None;
    }
}
