use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::graph::Graph;
use crate::types::{AgentId, AgentStatus, ClientId};

/// Which identifier space an agent currently lives in.
///
/// A draft only has a client placeholder. Once the repository accepts the
/// agent, the server identifier is canonical and the placeholder is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentIdentity {
    Draft(ClientId),
    Persisted(AgentId),
}

impl AgentIdentity {
    pub fn draft() -> Self {
        AgentIdentity::Draft(ClientId::generate())
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, AgentIdentity::Draft(_))
    }

    pub fn persisted_id(&self) -> Option<&AgentId> {
        match self {
            AgentIdentity::Persisted(id) => Some(id),
            AgentIdentity::Draft(_) => None,
        }
    }

    /// Key under which this agent is known locally: the server id when it
    /// exists, otherwise the client placeholder.
    pub fn key(&self) -> &str {
        match self {
            AgentIdentity::Draft(id) => id.as_str(),
            AgentIdentity::Persisted(id) => id.as_str(),
        }
    }
}

impl Default for AgentIdentity {
    fn default() -> Self {
        Self::draft()
    }
}

/// Only the server id goes on the wire; drafts serialize without one.
fn serialize_identity<S: Serializer>(identity: &AgentIdentity, s: S) -> Result<S::Ok, S::Error> {
    match identity {
        AgentIdentity::Persisted(id) => s.serialize_str(id.as_str()),
        AgentIdentity::Draft(_) => s.serialize_none(),
    }
}

/// Agent as the backend sends it. Records may carry the server `_id` next to
/// the client `id` they were posted with; `_id` wins when both are present.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentRecord {
    #[serde(rename = "_id", default)]
    server_id: Option<String>,
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(flatten)]
    graph: Graph,
    #[serde(default)]
    status: AgentStatus,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

impl From<AgentRecord> for Agent {
    fn from(record: AgentRecord) -> Self {
        let non_empty = |id: Option<String>| id.filter(|id| !id.is_empty());
        let identity = match non_empty(record.server_id).or_else(|| non_empty(record.id)) {
            Some(id) => AgentIdentity::Persisted(AgentId(id)),
            None => AgentIdentity::draft(),
        };
        Agent {
            identity,
            name: record.name,
            description: record.description,
            graph: record.graph,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// A saved (or about to be saved) automation workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AgentRecord")]
pub struct Agent {
    #[serde(
        rename = "_id",
        serialize_with = "serialize_identity",
        skip_serializing_if = "AgentIdentity::is_draft"
    )]
    pub identity: AgentIdentity,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub graph: Graph,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// An empty draft named "Untitled Agent".
    pub fn new_draft() -> Self {
        Self::draft("Untitled Agent", "")
    }

    pub fn draft(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            identity: AgentIdentity::draft(),
            name: name.into(),
            description: description.into(),
            graph: Graph::default(),
            status: AgentStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the graph.
    pub fn with_graph(mut self, graph: Graph) -> Self {
        self.graph = graph;
        self
    }

    pub fn id(&self) -> Option<&AgentId> {
        self.identity.persisted_id()
    }

    /// Adopt the server identifier. The client placeholder is discarded.
    pub fn mark_persisted(&mut self, id: AgentId) {
        self.identity = AgentIdentity::Persisted(id);
    }

    pub fn set_status(&mut self, status: AgentStatus) {
        self.status = status;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whether name, description, nodes and edges match `other`.
    ///
    /// Identity, status and timestamps are ignored.
    pub fn same_content(&self, other: &Agent) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.graph == other.graph
    }
}
