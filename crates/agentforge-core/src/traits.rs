use futures::future::BoxFuture;

use crate::agent::Agent;
use crate::error::Result;
use crate::execution::{ExecutionRecord, ExecutionTicket};
use crate::types::AgentId;

/// Agent repository: persistence boundary that owns identity assignment.
pub trait AgentRepository: Send + Sync + 'static {
    /// Persist a new agent. The returned record carries the server id.
    fn create<'a>(&'a self, agent: &'a Agent) -> BoxFuture<'a, Result<Agent>>;

    /// Replace the stored agent. Last write wins.
    fn update<'a>(&'a self, id: &'a AgentId, agent: &'a Agent) -> BoxFuture<'a, Result<Agent>>;

    /// All agents visible to the current account.
    fn list(&self) -> BoxFuture<'_, Result<Vec<Agent>>>;

    /// A single agent, or `NotFound`.
    fn get<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Agent>>;

    /// Remove an agent. Deleting an absent id yields `NotFound`.
    fn delete<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<()>>;
}

/// Execution gateway: runs persisted agents somewhere else.
pub trait ExecutionGateway: Send + Sync + 'static {
    /// Submit an agent for execution. Fire-and-forget: failures of the run
    /// itself are reported later through execution records.
    fn execute<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<ExecutionTicket>>;

    /// Execution records for an agent, newest first as the gateway returns them.
    fn executions<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Vec<ExecutionRecord>>>;
}
