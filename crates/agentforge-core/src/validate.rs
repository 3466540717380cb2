//! Save and execution readiness checks for agent graphs.
//!
//! Every check runs and every violation is collected, so the user sees all
//! unmet rules at once. Nothing here mutates the graph.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::error::{ForgeError, Result};
use crate::graph::Graph;
use crate::types::{EdgeId, NodeId};

/// Which optional structural rules are enforced.
///
/// `permissive()` accepts anything an editor could save before: only
/// dangling edges and duplicate node ids are rejected. The default is strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Require a trigger node with no incoming edge.
    #[serde(default = "default_true")]
    pub require_entry_trigger: bool,
    /// Allow edges whose target is a trigger node.
    #[serde(default)]
    pub allow_trigger_targets: bool,
    /// Allow edges whose source and target are the same node.
    #[serde(default)]
    pub allow_self_loops: bool,
    /// Allow several edges between the same source and target.
    #[serde(default)]
    pub allow_parallel_edges: bool,
    /// Run each node's own config checks (cron syntax, empty fields).
    #[serde(default = "default_true")]
    pub check_node_config: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            require_entry_trigger: true,
            allow_trigger_targets: false,
            allow_self_loops: false,
            allow_parallel_edges: false,
            check_node_config: true,
        }
    }
}

impl ValidationPolicy {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn permissive() -> Self {
        Self {
            require_entry_trigger: false,
            allow_trigger_targets: true,
            allow_self_loops: true,
            allow_parallel_edges: true,
            check_node_config: false,
        }
    }
}

/// A single unmet rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NotPersisted,
    NoNodes,
    DuplicateNodeId(NodeId),
    DanglingSource { edge: EdgeId, node: NodeId },
    DanglingTarget { edge: EdgeId, node: NodeId },
    NoEntryTrigger,
    TriggerAsTarget { edge: EdgeId, node: NodeId },
    SelfLoop { edge: EdgeId },
    ParallelEdge { edge: EdgeId, source: NodeId, target: NodeId },
    InvalidConfig { node: NodeId, reason: String },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::NotPersisted => {
                write!(f, "agent has not been saved yet; save it before running")
            }
            Violation::NoNodes => write!(f, "graph has no nodes; add some nodes first"),
            Violation::DuplicateNodeId(id) => write!(f, "node id '{}' is used more than once", id),
            Violation::DanglingSource { edge, node } => {
                write!(f, "edge '{}' starts at missing node '{}'", edge, node)
            }
            Violation::DanglingTarget { edge, node } => {
                write!(f, "edge '{}' points to missing node '{}'", edge, node)
            }
            Violation::NoEntryTrigger => {
                write!(f, "graph has no entry point: add a trigger with no incoming edges")
            }
            Violation::TriggerAsTarget { edge, node } => {
                write!(f, "edge '{}' points into trigger '{}'", edge, node)
            }
            Violation::SelfLoop { edge } => write!(f, "edge '{}' connects a node to itself", edge),
            Violation::ParallelEdge {
                edge,
                source,
                target,
            } => write!(
                f,
                "edge '{}' duplicates an existing connection {} -> {}",
                edge, source, target
            ),
            Violation::InvalidConfig { node, reason } => {
                write!(f, "node '{}' is misconfigured: {}", node, reason)
            }
        }
    }
}

/// All violations found in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.violations.contains(violation)
    }

    /// `Ok(())` when clean, otherwise `ForgeError::Validation`.
    pub fn into_result(self) -> Result<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ForgeError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Checks a graph against a policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    policy: ValidationPolicy,
}

impl Validator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Structural rules that gate persistence. An empty graph may be saved.
    pub fn check_graph(&self, graph: &Graph) -> ValidationReport {
        let mut violations = Vec::new();

        let mut ids: HashSet<&NodeId> = HashSet::new();
        for node in &graph.nodes {
            if !ids.insert(&node.id) {
                violations.push(Violation::DuplicateNodeId(node.id.clone()));
            }
        }

        let mut pairs: HashSet<(&NodeId, &NodeId)> = HashSet::new();
        for edge in &graph.edges {
            if !ids.contains(&edge.source) {
                violations.push(Violation::DanglingSource {
                    edge: edge.id.clone(),
                    node: edge.source.clone(),
                });
            }
            match graph.node(&edge.target) {
                None => violations.push(Violation::DanglingTarget {
                    edge: edge.id.clone(),
                    node: edge.target.clone(),
                }),
                Some(target) if target.is_trigger() && !self.policy.allow_trigger_targets => {
                    violations.push(Violation::TriggerAsTarget {
                        edge: edge.id.clone(),
                        node: edge.target.clone(),
                    });
                }
                Some(_) => {}
            }
            if edge.is_self_loop() && !self.policy.allow_self_loops {
                violations.push(Violation::SelfLoop {
                    edge: edge.id.clone(),
                });
            }
            if !pairs.insert((&edge.source, &edge.target)) && !self.policy.allow_parallel_edges {
                violations.push(Violation::ParallelEdge {
                    edge: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                });
            }
        }

        if self.policy.require_entry_trigger
            && !graph.is_empty()
            && graph.entry_points().is_empty()
        {
            violations.push(Violation::NoEntryTrigger);
        }

        if self.policy.check_node_config {
            for node in &graph.nodes {
                if let Some(reason) = node.config.check() {
                    violations.push(Violation::InvalidConfig {
                        node: node.id.clone(),
                        reason,
                    });
                }
            }
        }

        ValidationReport { violations }
    }

    /// Rules that gate a save.
    pub fn check_save(&self, agent: &Agent) -> ValidationReport {
        self.check_graph(&agent.graph)
    }

    /// Rules that gate execution: a durable id, at least one node, and a
    /// structurally sound graph.
    pub fn check_execution(&self, agent: &Agent) -> ValidationReport {
        let mut report = ValidationReport::default();
        if agent.id().is_none() {
            report.violations.push(Violation::NotPersisted);
        }
        if agent.graph.is_empty() {
            report.violations.push(Violation::NoNodes);
        }
        report
            .violations
            .extend(self.check_graph(&agent.graph).violations);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeConfig};
    use crate::types::AgentId;

    fn trigger(id: &str) -> Node {
        Node::new(id, "Webhook Trigger", NodeConfig::WebhookTrigger { path: None })
    }

    fn action(id: &str) -> Node {
        Node::new(
            id,
            "AI Process",
            NodeConfig::AiProcess {
                prompt: "analyze".into(),
            },
        )
    }

    fn persisted(graph: Graph) -> Agent {
        let mut agent = Agent::new_draft().with_graph(graph);
        agent.mark_persisted(AgentId::from("a1"));
        agent
    }

    #[test]
    fn test_clean_graph_passes_strict() {
        let graph = Graph::new(
            vec![trigger("trigger-1"), action("action-1")],
            vec![Edge::connect("trigger-1", "action-1")],
        );
        let report = Validator::default().check_execution(&persisted(graph));
        assert!(report.is_ok(), "{}", report);
    }

    #[test]
    fn test_empty_graph_rejected_for_execution() {
        let report = Validator::default().check_execution(&persisted(Graph::default()));
        assert_eq!(report.violations, vec![Violation::NoNodes]);
        assert!(report.to_string().contains("no nodes"));
    }

    #[test]
    fn test_empty_graph_may_be_saved() {
        assert!(Validator::default().check_save(&Agent::new_draft()).is_ok());
    }

    #[test]
    fn test_draft_rejected_for_execution() {
        let agent = Agent::new_draft().with_graph(Graph::new(vec![trigger("trigger-1")], vec![]));
        let report = Validator::default().check_execution(&agent);
        assert_eq!(report.violations, vec![Violation::NotPersisted]);
    }

    #[test]
    fn test_dangling_edges_reported_on_both_ends() {
        let graph = Graph::new(
            vec![trigger("trigger-1")],
            vec![
                Edge::connect("trigger-1", "ghost"),
                Edge::connect("phantom", "trigger-1"),
            ],
        );
        let report = Validator::new(ValidationPolicy::permissive()).check_graph(&graph);
        assert!(report.contains(&Violation::DanglingTarget {
            edge: "e-trigger-1-ghost".into(),
            node: "ghost".into(),
        }));
        assert!(report.contains(&Violation::DanglingSource {
            edge: "e-phantom-trigger-1".into(),
            node: "phantom".into(),
        }));
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_strict_rejects_trigger_targets_and_missing_entry() {
        let graph = Graph::new(
            vec![trigger("trigger-1"), action("action-1")],
            vec![
                Edge::connect("trigger-1", "action-1"),
                Edge::connect("action-1", "trigger-1"),
            ],
        );
        let strict = Validator::default().check_graph(&graph);
        assert!(strict.contains(&Violation::NoEntryTrigger));
        assert!(strict.contains(&Violation::TriggerAsTarget {
            edge: "e-action-1-trigger-1".into(),
            node: "trigger-1".into(),
        }));

        assert!(Validator::new(ValidationPolicy::permissive())
            .check_graph(&graph)
            .is_ok());
    }

    #[test]
    fn test_strict_rejects_self_loops_and_parallel_edges() {
        let graph = Graph::new(
            vec![trigger("trigger-1"), action("action-1")],
            vec![
                Edge::connect("trigger-1", "action-1"),
                Edge::with_id("dup", "trigger-1", "action-1"),
                Edge::connect("action-1", "action-1"),
            ],
        );
        let report = Validator::default().check_graph(&graph);
        assert!(report.contains(&Violation::SelfLoop {
            edge: "e-action-1-action-1".into()
        }));
        assert!(report.contains(&Violation::ParallelEdge {
            edge: "dup".into(),
            source: "trigger-1".into(),
            target: "action-1".into(),
        }));
    }

    #[test]
    fn test_graph_without_trigger_has_no_entry() {
        let graph = Graph::new(vec![action("action-1")], vec![]);
        let report = Validator::default().check_graph(&graph);
        assert_eq!(report.violations, vec![Violation::NoEntryTrigger]);
    }

    #[test]
    fn test_duplicate_node_ids_always_rejected() {
        let graph = Graph::new(vec![trigger("trigger-1"), trigger("trigger-1")], vec![]);
        let report = Validator::new(ValidationPolicy::permissive()).check_graph(&graph);
        assert_eq!(
            report.violations,
            vec![Violation::DuplicateNodeId("trigger-1".into())]
        );
    }

    #[test]
    fn test_node_config_checks() {
        let graph = Graph::new(
            vec![Node::new(
                "trigger-1",
                "Schedule Trigger",
                NodeConfig::ScheduleTrigger {
                    schedule: "Daily".into(),
                    cron: Some("every tuesday-ish".into()),
                },
            )],
            vec![],
        );
        let report = Validator::default().check_graph(&graph);
        assert!(matches!(
            report.violations.as_slice(),
            [Violation::InvalidConfig { .. }]
        ));
    }

    #[test]
    fn test_into_result() {
        let err = ValidationReport {
            violations: vec![Violation::NoNodes],
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, ForgeError::Validation(_)));
        assert!(err.to_string().contains("no nodes"));
        assert!(ValidationReport::default().into_result().is_ok());
    }

    #[test]
    fn test_policy_from_toml_defaults_to_strict() {
        let policy: ValidationPolicy = toml::from_str("allow_self_loops = true").unwrap();
        assert!(policy.allow_self_loops);
        assert!(policy.require_entry_trigger);
        assert!(!policy.allow_trigger_targets);
    }
}
