use agentforge_core::graph::{Edge, Graph, HttpMethod, Node, NodeConfig, NodeTemplate};
use agentforge_core::{Agent, ForgeError, NodeId, Result};
use serde::Serialize;
use tracing::debug;

/// Column the generated nodes are laid out in.
const COLUMN_X: f64 = 100.0;
const FIRST_ROW_Y: f64 = 50.0;
const ROW_SPACING: f64 = 100.0;

/// Words of the request kept in the agent name.
const NAME_WORDS: usize = 5;

/// How often a schedule trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Daily,
    WeeklySunday,
    WeeklyMonday,
    Morning,
    Evening,
    /// Recurring, but the request names no particular time.
    Unspecified,
}

impl Cadence {
    fn detect(text: &str) -> Self {
        if text.contains("daily") || text.contains("every day") {
            Cadence::Daily
        } else if text.contains("sunday") {
            Cadence::WeeklySunday
        } else if text.contains("monday") {
            Cadence::WeeklyMonday
        } else if text.contains("morning") {
            Cadence::Morning
        } else if text.contains("8pm") || text.contains("evening") {
            Cadence::Evening
        } else {
            Cadence::Unspecified
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cadence::Daily => "Daily",
            Cadence::WeeklySunday | Cadence::WeeklyMonday => "Weekly",
            Cadence::Morning => "9:00 AM",
            Cadence::Evening => "8:00 PM",
            Cadence::Unspecified => "Recurring",
        }
    }

    /// Cron expression, seconds field first.
    pub fn cron(&self) -> &'static str {
        match self {
            Cadence::Daily | Cadence::Morning => "0 0 9 * * *",
            Cadence::WeeklySunday => "0 0 9 * * Sun",
            Cadence::WeeklyMonday => "0 0 9 * * Mon",
            Cadence::Evening => "0 0 20 * * *",
            Cadence::Unspecified => "0 0 * * * *",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cadence", rename_all = "snake_case")]
pub enum TriggerChoice {
    Schedule(Cadence),
    Webhook,
}

impl TriggerChoice {
    fn template(&self) -> NodeTemplate {
        match self {
            TriggerChoice::Schedule(_) => NodeTemplate::ScheduleTrigger,
            TriggerChoice::Webhook => NodeTemplate::WebhookTrigger,
        }
    }

    /// Human-readable timing shown next to the trigger.
    pub fn timing(&self) -> &'static str {
        match self {
            TriggerChoice::Schedule(cadence) => cadence.label(),
            TriggerChoice::Webhook => "Real-time",
        }
    }
}

/// An action step, in the order it appears in the generated chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStep {
    SendEmail,
    AiProcess,
    ApiCall,
}

impl ActionStep {
    fn node_id(&self) -> &'static str {
        match self {
            ActionStep::SendEmail => "action-email",
            ActionStep::AiProcess => "action-ai",
            ActionStep::ApiCall => "action-api",
        }
    }

    fn template(&self) -> NodeTemplate {
        match self {
            ActionStep::SendEmail => NodeTemplate::SendEmail,
            ActionStep::AiProcess => NodeTemplate::AiProcess,
            ActionStep::ApiCall => NodeTemplate::ApiCall,
        }
    }

    pub fn label(&self) -> &'static str {
        self.template().label()
    }
}

/// Everything the generator knows about a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Intent {
    /// The request as given, trimmed.
    pub text: String,
    pub trigger: TriggerChoice,
    pub actions: Vec<ActionStep>,
    pub condition: bool,
}

/// Classify a request with ordered substring rules on its lower-cased text.
///
/// Returns `InvalidInput` for an empty or blank request.
pub fn classify(text: &str) -> Result<Intent> {
    let original = text.trim();
    if original.is_empty() {
        return Err(ForgeError::InvalidInput(
            "describe what the agent should do".to_string(),
        ));
    }
    let text = original.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

    let trigger = if has(&["every", "daily"]) {
        TriggerChoice::Schedule(Cadence::detect(&text))
    } else {
        TriggerChoice::Webhook
    };

    let mut actions = Vec::new();
    if has(&["email", "send"]) {
        actions.push(ActionStep::SendEmail);
    }
    if has(&["summarize", "analyze"]) {
        actions.push(ActionStep::AiProcess);
    }
    if has(&["api", "fetch", "get data"]) {
        actions.push(ActionStep::ApiCall);
    }
    let condition = has(&["if", "when"]);

    let intent = Intent {
        text: original.to_string(),
        trigger,
        actions,
        condition,
    };
    debug!(trigger = ?intent.trigger, actions = intent.actions.len(), condition, "Request classified");
    Ok(intent)
}

impl Intent {
    /// The starter graph: one trigger, then the matched actions and the
    /// optional condition chained in a single column.
    pub fn graph(&self) -> Graph {
        let mut graph = Graph::default();
        let mut row = 0usize;
        let mut place = |graph: &mut Graph, node: Node| -> NodeId {
            let y = FIRST_ROW_Y + ROW_SPACING * row as f64;
            row += 1;
            let node = node.at(COLUMN_X, y);
            let id = node.id.clone();
            if let Some(tail) = graph.nodes.last() {
                graph.edges.push(Edge::connect(tail.id.clone(), id.clone()));
            }
            graph.nodes.push(node);
            id
        };

        place(&mut graph, self.trigger_node());
        for step in &self.actions {
            place(&mut graph, self.action_node(*step));
        }
        if self.condition {
            let template = NodeTemplate::IfElse;
            place(
                &mut graph,
                Node::new("condition-1", template.label(), template.default_config()),
            );
        }
        graph
    }

    fn trigger_node(&self) -> Node {
        let config = match self.trigger {
            TriggerChoice::Schedule(cadence) => NodeConfig::ScheduleTrigger {
                schedule: cadence.label().to_string(),
                cron: Some(cadence.cron().to_string()),
            },
            TriggerChoice::Webhook => NodeConfig::WebhookTrigger { path: None },
        };
        Node::new("trigger-1", self.trigger.template().label(), config)
    }

    fn action_node(&self, step: ActionStep) -> Node {
        let config = match step {
            ActionStep::AiProcess => NodeConfig::AiProcess {
                prompt: format!("Analyze and summarize: {}", self.text),
            },
            ActionStep::ApiCall => NodeConfig::ApiCall {
                url: String::new(),
                method: HttpMethod::Get,
            },
            ActionStep::SendEmail => step.template().default_config(),
        };
        Node::new(step.node_id(), step.label(), config)
    }

    /// First five words of the request, with `...` when cut short.
    pub fn agent_name(&self) -> String {
        let words: Vec<&str> = self.text.split_whitespace().collect();
        if words.len() > NAME_WORDS {
            format!("{}...", words[..NAME_WORDS].join(" "))
        } else {
            words.join(" ")
        }
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            name: self.agent_name(),
            trigger: self.trigger.template().label().to_string(),
            timing: self.trigger.timing().to_string(),
            actions: self.actions.iter().map(|a| a.label().to_string()).collect(),
            condition: self.condition,
        }
    }

    /// A draft agent holding the starter graph.
    pub fn agent(&self) -> Agent {
        Agent::draft(self.agent_name(), self.text.clone()).with_graph(self.graph())
    }
}

/// Display facts about a generated workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub name: String,
    pub trigger: String,
    pub timing: String,
    pub actions: Vec<String>,
    pub condition: bool,
}

/// A generated draft together with its summary.
#[derive(Debug, Clone)]
pub struct Plan {
    pub intent: Intent,
    pub agent: Agent,
    pub summary: PlanSummary,
}

/// Classify `text` and build the draft agent and its summary.
pub fn plan(text: &str) -> Result<Plan> {
    let intent = classify(text)?;
    let agent = intent.agent();
    let summary = intent.summary();
    Ok(Plan {
        intent,
        agent,
        summary,
    })
}
