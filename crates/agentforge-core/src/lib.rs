pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod graph;
pub mod traits;
pub mod types;
pub mod validate;

pub use agent::{Agent, AgentIdentity};
pub use config::AppConfig;
pub use error::{ForgeError, Result};
pub use event::{EventBus, ForgeEvent};
pub use execution::{ExecutionRecord, ExecutionTicket, RunStatus};
pub use graph::{Edge, Graph, GraphStore, Node, NodeConfig, NodeKind, NodePatch, NodeTemplate};
pub use traits::{AgentRepository, ExecutionGateway};
pub use types::*;
pub use validate::{ValidationPolicy, ValidationReport, Validator, Violation};
