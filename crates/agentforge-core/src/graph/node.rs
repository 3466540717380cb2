use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Position};

/// Role of a node in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Trigger,
    Action,
    Condition,
    Data,
}

impl NodeKind {
    /// Prefix used for sequential node ids (`trigger-1`, `action-2`, ...).
    pub fn id_prefix(&self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Condition => "condition",
            NodeKind::Data => "data",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id_prefix())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Kind-specific configuration of a node.
///
/// The variant fixes the node's kind: triggers, actions, conditions and data
/// sources each carry their own typed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "camelCase")]
pub enum NodeConfig {
    /// Fires on a recurring schedule.
    ScheduleTrigger {
        /// Human-readable cadence ("Daily", "8:00 PM", ...).
        #[serde(default)]
        schedule: String,
        /// Cron expression (seconds field first).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cron: Option<String>,
    },
    /// Fires on an incoming HTTP call.
    WebhookTrigger {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    SendEmail {
        #[serde(default)]
        to: String,
        #[serde(default)]
        subject: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    AiProcess {
        #[serde(default)]
        prompt: String,
    },
    ApiCall {
        #[serde(default)]
        url: String,
        #[serde(default)]
        method: HttpMethod,
    },
    IfElse {
        #[serde(default)]
        condition: String,
    },
    DatabaseQuery {
        #[serde(default)]
        query: String,
    },
    Spreadsheet {
        #[serde(default)]
        sheet: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range: Option<String>,
    },
}

impl NodeConfig {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::ScheduleTrigger { .. } | NodeConfig::WebhookTrigger { .. } => {
                NodeKind::Trigger
            }
            NodeConfig::SendEmail { .. }
            | NodeConfig::AiProcess { .. }
            | NodeConfig::ApiCall { .. } => NodeKind::Action,
            NodeConfig::IfElse { .. } => NodeKind::Condition,
            NodeConfig::DatabaseQuery { .. } | NodeConfig::Spreadsheet { .. } => NodeKind::Data,
        }
    }

    /// Wire name of the template (`scheduleTrigger`, `sendEmail`, ...).
    pub fn template_name(&self) -> &'static str {
        match self {
            NodeConfig::ScheduleTrigger { .. } => "scheduleTrigger",
            NodeConfig::WebhookTrigger { .. } => "webhookTrigger",
            NodeConfig::SendEmail { .. } => "sendEmail",
            NodeConfig::AiProcess { .. } => "aiProcess",
            NodeConfig::ApiCall { .. } => "apiCall",
            NodeConfig::IfElse { .. } => "ifElse",
            NodeConfig::DatabaseQuery { .. } => "databaseQuery",
            NodeConfig::Spreadsheet { .. } => "spreadsheet",
        }
    }

    /// Check the settings themselves, independent of the graph.
    ///
    /// Returns a description of the first problem found.
    pub fn check(&self) -> Option<String> {
        match self {
            NodeConfig::ScheduleTrigger {
                cron: Some(expr), ..
            } => cron::Schedule::from_str(expr)
                .err()
                .map(|e| format!("invalid cron expression '{}': {}", expr, e)),
            NodeConfig::SendEmail { to, .. } if to.trim().is_empty() => {
                Some("email recipient is empty".to_string())
            }
            NodeConfig::IfElse { condition } if condition.trim().is_empty() => {
                Some("condition expression is empty".to_string())
            }
            _ => None,
        }
    }
}

/// A single workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub position: Position,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub config: NodeConfig,
}

impl Node {
    /// Create a node with the given settings. The kind follows from `config`.
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            label: label.into(),
            description: None,
            config,
        }
    }

    /// Set the position.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    pub fn is_trigger(&self) -> bool {
        self.kind() == NodeKind::Trigger
    }
}

/// Partial update for a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct NodePatch {
    pub label: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub position: Option<Position>,
    /// Must keep the node's kind; a config of another kind is refused.
    pub config: Option<NodeConfig>,
}

impl NodePatch {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn config(config: NodeConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    pub fn position(x: f64, y: f64) -> Self {
        Self {
            position: Some(Position::new(x, y)),
            ..Self::default()
        }
    }

    /// Whether applying this patch would keep `node`'s kind.
    pub fn keeps_kind_of(&self, node: &Node) -> bool {
        self.config
            .as_ref()
            .map_or(true, |c| c.kind() == node.kind())
    }

    /// Merge into `node`. Callers check `keeps_kind_of` first.
    pub(crate) fn apply(self, node: &mut Node) {
        if let Some(label) = self.label {
            node.label = label;
        }
        if let Some(description) = self.description {
            node.description = description;
        }
        if let Some(position) = self.position {
            node.position = position;
        }
        if let Some(config) = self.config {
            node.config = config;
        }
    }
}
