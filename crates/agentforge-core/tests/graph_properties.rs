//! Property tests for the graph store and validation.
//!
//! Graphs are built from a small id pool so that collisions and dangling
//! edges are common.

use std::collections::HashSet;

use agentforge_core::{
    Agent, AgentId, Edge, GraphStore, NodeId, NodeTemplate, ValidationPolicy, Validator,
    Violation,
};
use proptest::prelude::*;

fn arb_template() -> impl Strategy<Value = NodeTemplate> {
    prop::sample::select(NodeTemplate::ALL.to_vec())
}

fn arb_node_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("trigger-1".to_string()),
        Just("action-1".to_string()),
        Just("action-2".to_string()),
        Just("condition-1".to_string()),
        Just("data-1".to_string()),
        "[a-z]{1,3}",
    ]
}

/// Nodes to add (with requested ids) and edges between arbitrary ids.
fn arb_ops() -> impl Strategy<Value = (Vec<(String, NodeTemplate)>, Vec<(String, String)>)> {
    (
        prop::collection::vec((arb_node_id(), arb_template()), 0..10),
        prop::collection::vec((arb_node_id(), arb_node_id()), 0..12),
    )
}

fn build(nodes: &[(String, NodeTemplate)], edges: &[(String, String)]) -> GraphStore {
    let mut store = GraphStore::new();
    for (i, (id, template)) in nodes.iter().enumerate() {
        store.add_node(template.instantiate(id.as_str(), 100.0, 50.0 + 100.0 * i as f64));
    }
    for (source, target) in edges {
        store.add_edge(Edge::connect(source.as_str(), target.as_str()));
    }
    store
}

fn persisted(store: &GraphStore) -> Agent {
    let mut agent = Agent::new_draft().with_graph(store.snapshot());
    agent.mark_persisted(AgentId::from("prop-agent"));
    agent
}

proptest! {
    #[test]
    fn node_ids_stay_unique((nodes, edges) in arb_ops()) {
        let store = build(&nodes, &edges);
        let ids: HashSet<&NodeId> = store.nodes().iter().map(|n| &n.id).collect();
        prop_assert_eq!(ids.len(), nodes.len());

        let edge_ids: HashSet<_> = store.edges().iter().map(|e| &e.id).collect();
        prop_assert_eq!(edge_ids.len(), edges.len());
    }

    #[test]
    fn delete_cascades_edges((nodes, edges) in arb_ops(), pick in any::<prop::sample::Index>()) {
        let mut store = build(&nodes, &edges);
        prop_assume!(!store.nodes().is_empty());

        let victim = store.nodes()[pick.index(store.nodes().len())].id.clone();
        store.set_selected_node(Some(victim.clone()));
        prop_assert!(store.delete_node(&victim).is_some());

        prop_assert!(store.edges().iter().all(|e| e.source != victim && e.target != victim));
        prop_assert!(!store.graph().contains_node(&victim));
        prop_assert!(store.selected_node().is_none());
    }

    #[test]
    fn permissive_execution_iff_nonempty_and_resolved((nodes, edges) in arb_ops()) {
        let store = build(&nodes, &edges);
        let graph = store.graph();
        let resolved = graph
            .edges
            .iter()
            .all(|e| graph.contains_node(&e.source) && graph.contains_node(&e.target));
        let expected = !graph.is_empty() && resolved;

        let report = Validator::new(ValidationPolicy::permissive()).check_execution(&persisted(&store));
        prop_assert_eq!(report.is_ok(), expected, "{}", report);
    }

    #[test]
    fn dangling_edges_always_rejected(
        (nodes, edges) in arb_ops(),
        ghost in "[A-Z]{4}",
        strict in any::<bool>(),
    ) {
        let mut store = build(&nodes, &edges);
        let anchor = store
            .nodes()
            .first()
            .map(|n| n.id.clone())
            .unwrap_or_else(|| NodeId::from("trigger-1"));
        store.add_edge(Edge::connect(anchor, NodeId::from(ghost.as_str())));

        let policy = if strict { ValidationPolicy::strict() } else { ValidationPolicy::permissive() };
        let validator = Validator::new(policy);
        let agent = persisted(&store);

        let save = validator.check_save(&agent);
        prop_assert!(!save.is_ok());
        let ghost_id = NodeId::from(ghost.as_str());
        let reported = save.violations.iter().any(|v| matches!(
            v,
            Violation::DanglingTarget { node, .. } if *node == ghost_id
        ));
        prop_assert!(reported, "dangling target {} not reported", ghost_id);
        prop_assert!(!validator.check_execution(&agent).is_ok());
    }
}
