use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use agentforge_core::execution::RunStatus;
use agentforge_core::{
    Agent, AgentId, AgentRepository, ExecutionGateway, ExecutionRecord, ExecutionTicket,
    ForgeError, Result,
};
use chrono::Utc;
use futures::future::BoxFuture;
use tracing::debug;

/// In-process repository and gateway.
///
/// Assigns uuid server ids, starts every execution as `running`, and can be
/// switched offline to make every call fail with `Transport`.
#[derive(Default)]
pub struct MemoryRepository {
    agents: Mutex<BTreeMap<String, Agent>>,
    executions: Mutex<HashMap<String, Vec<ExecutionRecord>>>,
    offline: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.agents.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the execution records reported for an agent.
    pub fn set_executions(&self, id: &AgentId, records: Vec<ExecutionRecord>) -> Result<()> {
        lock(&self.executions)?.insert(id.as_str().to_string(), records);
        Ok(())
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ForgeError::Transport("repository offline".to_string()));
        }
        Ok(())
    }

    fn store(&self, id: AgentId, agent: &Agent) -> Result<Agent> {
        let mut stored = agent.clone();
        stored.mark_persisted(id.clone());
        stored.touch();
        lock(&self.agents)?.insert(id.as_str().to_string(), stored.clone());
        Ok(stored)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| ForgeError::Database(format!("lock poisoned: {}", e)))
}

impl AgentRepository for MemoryRepository {
    fn create<'a>(&'a self, agent: &'a Agent) -> BoxFuture<'a, Result<Agent>> {
        Box::pin(async move {
            self.check_online()?;
            let id = AgentId(uuid::Uuid::new_v4().to_string());
            debug!(agent_id = %id, "Agent stored");
            self.store(id, agent)
        })
    }

    fn update<'a>(&'a self, id: &'a AgentId, agent: &'a Agent) -> BoxFuture<'a, Result<Agent>> {
        Box::pin(async move {
            self.check_online()?;
            if !lock(&self.agents)?.contains_key(id.as_str()) {
                return Err(ForgeError::NotFound(id.to_string()));
            }
            self.store(id.clone(), agent)
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Agent>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(lock(&self.agents)?.values().cloned().collect())
        })
    }

    fn get<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Agent>> {
        Box::pin(async move {
            self.check_online()?;
            lock(&self.agents)?
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| ForgeError::NotFound(id.to_string()))
        })
    }

    fn delete<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.check_online()?;
            lock(&self.agents)?
                .remove(id.as_str())
                .map(|_| ())
                .ok_or_else(|| ForgeError::NotFound(id.to_string()))
        })
    }
}

impl ExecutionGateway for MemoryRepository {
    fn execute<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<ExecutionTicket>> {
        Box::pin(async move {
            self.check_online()?;
            let name = lock(&self.agents)?
                .get(id.as_str())
                .map(|a| a.name.clone())
                .ok_or_else(|| ForgeError::NotFound(id.to_string()))?;

            let record = ExecutionRecord {
                id: uuid::Uuid::new_v4().to_string(),
                status: RunStatus::Running,
                start_time: Utc::now(),
                end_time: None,
                duration_ms: None,
                logs: Vec::new(),
                results: Vec::new(),
                error: None,
            };
            lock(&self.executions)?
                .entry(id.as_str().to_string())
                .or_default()
                .insert(0, record);

            Ok(ExecutionTicket {
                status: "started".to_string(),
                agent_name: name,
            })
        })
    }

    fn executions<'a>(&'a self, id: &'a AgentId) -> BoxFuture<'a, Result<Vec<ExecutionRecord>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(lock(&self.executions)?
                .get(id.as_str())
                .cloned()
                .unwrap_or_default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crud() {
        let repo = MemoryRepository::new();
        let draft = Agent::draft("Digest", "Email me a summary every day");

        let created = repo.create(&draft).await.unwrap();
        let id = created.id().cloned().unwrap();
        assert!(draft.same_content(&created));
        assert_eq!(repo.len(), 1);

        let mut renamed = created.clone();
        renamed.name = "Renamed".into();
        let updated = repo.update(&id, &renamed).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(repo.get(&id).await.unwrap().name, "Renamed");
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete(&id).await.unwrap();
        assert!(matches!(repo.delete(&id).await, Err(ForgeError::NotFound(_))));
        assert!(matches!(repo.get(&id).await, Err(ForgeError::NotFound(_))));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_offline_is_transport() {
        let repo = MemoryRepository::new();
        repo.set_offline(true);
        let err = repo.create(&Agent::new_draft()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_execute_records_running_run() {
        let repo = MemoryRepository::new();
        let created = repo.create(&Agent::draft("Runner", "")).await.unwrap();
        let id = created.id().cloned().unwrap();

        let ticket = repo.execute(&id).await.unwrap();
        assert_eq!(ticket.agent_name, "Runner");

        let runs = repo.executions(&id).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Running);

        let missing = AgentId::from("missing");
        assert!(matches!(repo.execute(&missing).await, Err(ForgeError::NotFound(_))));
    }
}
