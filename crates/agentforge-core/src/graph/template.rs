use crate::types::NodeId;

use super::node::{HttpMethod, Node, NodeConfig, NodeKind};

/// A node type offered by the editor's node library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTemplate {
    ScheduleTrigger,
    WebhookTrigger,
    SendEmail,
    ApiCall,
    AiProcess,
    IfElse,
    DatabaseQuery,
    Spreadsheet,
}

impl NodeTemplate {
    /// All templates, in library order.
    pub const ALL: [NodeTemplate; 8] = [
        NodeTemplate::ScheduleTrigger,
        NodeTemplate::WebhookTrigger,
        NodeTemplate::SendEmail,
        NodeTemplate::ApiCall,
        NodeTemplate::AiProcess,
        NodeTemplate::IfElse,
        NodeTemplate::DatabaseQuery,
        NodeTemplate::Spreadsheet,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NodeTemplate::ScheduleTrigger => "Schedule Trigger",
            NodeTemplate::WebhookTrigger => "Webhook Trigger",
            NodeTemplate::SendEmail => "Send Email",
            NodeTemplate::ApiCall => "API Call",
            NodeTemplate::AiProcess => "AI Process",
            NodeTemplate::IfElse => "If/Else",
            NodeTemplate::DatabaseQuery => "Database Query",
            NodeTemplate::Spreadsheet => "Get Spreadsheet",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            NodeTemplate::ScheduleTrigger => "Run on a schedule",
            NodeTemplate::WebhookTrigger => "Trigger via HTTP",
            NodeTemplate::SendEmail => "Send an email",
            NodeTemplate::ApiCall => "Call external API",
            NodeTemplate::AiProcess => "Process with AI",
            NodeTemplate::IfElse => "Conditional logic",
            NodeTemplate::DatabaseQuery => "Fetch from database",
            NodeTemplate::Spreadsheet => "Read from sheet",
        }
    }

    /// Default settings for a freshly dropped node.
    pub fn default_config(&self) -> NodeConfig {
        match self {
            NodeTemplate::ScheduleTrigger => NodeConfig::ScheduleTrigger {
                schedule: "Daily".to_string(),
                cron: Some("0 0 9 * * *".to_string()),
            },
            NodeTemplate::WebhookTrigger => NodeConfig::WebhookTrigger { path: None },
            NodeTemplate::SendEmail => NodeConfig::SendEmail {
                to: "user@example.com".to_string(),
                subject: "Automated Email".to_string(),
                body: None,
            },
            NodeTemplate::ApiCall => NodeConfig::ApiCall {
                url: String::new(),
                method: HttpMethod::Get,
            },
            NodeTemplate::AiProcess => NodeConfig::AiProcess {
                prompt: String::new(),
            },
            NodeTemplate::IfElse => NodeConfig::IfElse {
                condition: "value > 0".to_string(),
            },
            NodeTemplate::DatabaseQuery => NodeConfig::DatabaseQuery {
                query: String::new(),
            },
            NodeTemplate::Spreadsheet => NodeConfig::Spreadsheet {
                sheet: String::new(),
                range: None,
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.default_config().kind()
    }

    /// Build a node of this template.
    pub fn instantiate(&self, id: impl Into<NodeId>, x: f64, y: f64) -> Node {
        Node::new(id, self.label(), self.default_config())
            .at(x, y)
            .with_description(self.description())
    }

    /// Look a template up by its wire name (`sendEmail`) or label (`Send Email`).
    pub fn find(name: &str) -> Option<NodeTemplate> {
        NodeTemplate::ALL.into_iter().find(|t| {
            t.default_config().template_name().eq_ignore_ascii_case(name)
                || t.label().eq_ignore_ascii_case(name)
        })
    }
}
