use std::sync::Arc;

use agentforge_core::{
    Agent, AgentId, AgentIdentity, AgentRepository, AgentStatus, EventBus, ExecutionGateway,
    ExecutionTicket, ForgeError, ForgeEvent, GraphStore, Result, ValidationPolicy, Validator,
};
use tracing::{debug, info, warn};

use crate::cache::FallbackCache;

/// Result of a save.
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// Accepted by the repository; the agent now has its server id.
    Persisted(Agent),
    /// Repository unreachable; the agent was written to the fallback cache.
    Cached { key: String, reason: String },
}

/// One editing session over one agent.
///
/// Owns the graph store and the agent's metadata. Collaborators are passed in
/// explicitly. A failed save or run never touches the store, so the user can
/// retry without losing work.
pub struct EditorSession {
    repo: Arc<dyn AgentRepository>,
    gateway: Arc<dyn ExecutionGateway>,
    event_bus: Arc<EventBus>,
    cache: Option<Arc<FallbackCache>>,
    validator: Validator,
    /// Metadata. Its graph is stale: the store holds the live one.
    agent: Agent,
    store: GraphStore,
}

impl EditorSession {
    pub fn new(
        repo: Arc<dyn AgentRepository>,
        gateway: Arc<dyn ExecutionGateway>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            repo,
            gateway,
            event_bus,
            cache: None,
            validator: Validator::default(),
            agent: Agent::new_draft(),
            store: GraphStore::new(),
        }
    }

    /// Park saves here when the repository is unreachable.
    pub fn with_cache(mut self, cache: Arc<FallbackCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.validator = Validator::new(policy);
        self
    }

    /// Start over with an empty draft.
    pub fn new_draft(&mut self) {
        self.load(Agent::new_draft());
    }

    /// Edit an agent already in hand (generated, cached, or read from a file).
    pub fn load(&mut self, agent: Agent) {
        self.store.load(agent.graph.clone());
        self.agent = agent;
    }

    /// Load a persisted agent into the session.
    pub async fn open(&mut self, id: &AgentId) -> Result<()> {
        let agent = self.repo.get(id).await?;
        debug!(agent_id = %id, nodes = agent.graph.nodes.len(), "Agent opened");
        self.load(agent);
        Ok(())
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.agent.identity
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.agent.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.agent.description = description.into();
    }

    pub fn set_status(&mut self, status: AgentStatus) {
        self.agent.set_status(status);
    }

    /// The agent as it would be saved now.
    pub fn agent(&self) -> Agent {
        let mut agent = self.agent.clone();
        agent.graph = self.store.snapshot();
        agent
    }

    /// Validate, then create (draft) or update (persisted).
    ///
    /// Validation failures abort with `ForgeError::Validation`. Transport
    /// failures fall back to the cache when one is configured.
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let agent = self.agent();
        self.validator.check_save(&agent).into_result()?;

        let previous_key = agent.identity.key().to_string();
        let created = agent.identity.is_draft();
        let result = match agent.id() {
            Some(id) => self.repo.update(id, &agent).await,
            None => self.repo.create(&agent).await,
        };

        let saved = match result {
            Ok(saved) => saved,
            Err(e) if e.is_transport() => return self.fall_back(&agent, e),
            Err(e) => return Err(e),
        };
        let Some(id) = saved.id().cloned() else {
            return Err(ForgeError::Backend {
                status: 200,
                message: "repository returned no agent id".to_string(),
            });
        };

        self.agent.mark_persisted(id.clone());
        self.agent.created_at = saved.created_at;
        self.agent.updated_at = saved.updated_at;

        if let Some(cache) = &self.cache {
            // A successful save supersedes anything parked under the old key.
            match cache.remove(&previous_key) {
                Ok(true) => debug!(key = %previous_key, "Stale cache entry dropped"),
                Ok(false) => {}
                Err(e) => warn!(key = %previous_key, error = %e, "Failed to drop stale cache entry"),
            }
        }

        info!(agent_id = %id, created, "Agent saved");
        self.event_bus.publish(ForgeEvent::AgentSaved {
            agent_id: id,
            name: self.agent.name.clone(),
            created,
        });
        Ok(SaveOutcome::Persisted(self.agent()))
    }

    fn fall_back(&self, agent: &Agent, error: ForgeError) -> Result<SaveOutcome> {
        let Some(cache) = &self.cache else {
            return Err(error);
        };
        let reason = error.to_string();
        let key = cache.put(agent, &reason)?;
        warn!(key = %key, error = %reason, "Repository unreachable, agent cached locally");
        self.event_bus.publish(ForgeEvent::AgentCached {
            key: key.clone(),
            reason: reason.clone(),
        });
        Ok(SaveOutcome::Cached { key, reason })
    }

    /// Check execution readiness, then submit the agent.
    pub async fn run(&self) -> Result<ExecutionTicket> {
        let agent = self.agent();
        self.validator.check_execution(&agent).into_result()?;
        let Some(id) = agent.id() else {
            return Err(ForgeError::InvalidInput("agent has not been saved".to_string()));
        };

        let ticket = self.gateway.execute(id).await?;
        info!(agent_id = %id, status = %ticket.status, "Execution started");
        self.event_bus.publish(ForgeEvent::ExecutionStarted {
            agent_id: id.clone(),
            status: ticket.status.clone(),
        });
        Ok(ticket)
    }

    /// Delete the persisted record. The graph stays in the session as a new
    /// draft, so saving again creates a fresh agent.
    pub async fn delete(&mut self) -> Result<()> {
        let Some(id) = self.agent.id().cloned() else {
            return Err(ForgeError::InvalidInput("agent has not been saved".to_string()));
        };
        self.repo.delete(&id).await?;
        self.agent.identity = AgentIdentity::draft();
        info!(agent_id = %id, "Agent deleted");
        self.event_bus.publish(ForgeEvent::AgentDeleted { agent_id: id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use agentforge_core::{NodeTemplate, Violation};

    fn session(repo: &Arc<MemoryRepository>) -> EditorSession {
        EditorSession::new(repo.clone(), repo.clone(), Arc::new(EventBus::default()))
    }

    fn add_chain(session: &mut EditorSession) {
        let store = session.store_mut();
        let t = store.add_from_template(NodeTemplate::WebhookTrigger, 100.0, 50.0);
        let a = store.add_from_template(NodeTemplate::SendEmail, 100.0, 150.0);
        store.connect(&t, &a);
    }

    #[tokio::test]
    async fn test_save_creates_then_updates() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(&repo);
        add_chain(&mut s);
        s.set_name("Signup mailer");

        let first = match s.save().await.unwrap() {
            SaveOutcome::Persisted(agent) => agent,
            other => panic!("expected persisted, got {:?}", other),
        };
        let id = first.id().cloned().unwrap();
        assert!(!s.identity().is_draft());

        assert_eq!(first.updated_at, repo.get(&id).await.unwrap().updated_at);

        s.set_name("Signup mailer v2");
        s.save().await.unwrap();
        let stored = repo.get(&id).await.unwrap();
        assert_eq!(repo.len(), 1);
        assert_eq!(stored.name, "Signup mailer v2");
        assert_eq!(s.identity().persisted_id(), Some(&id));
        assert_eq!(s.agent().updated_at, stored.updated_at);
    }

    #[tokio::test]
    async fn test_save_rejects_dangling_edge_without_side_effects() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(&repo);
        add_chain(&mut s);
        let t = s.store().nodes()[0].id.clone();
        s.store_mut().connect(&t, &"ghost".into());
        let before = s.store().snapshot();

        let err = s.save().await.unwrap_err();
        match err {
            ForgeError::Validation(report) => assert!(report
                .violations
                .iter()
                .any(|v| matches!(v, Violation::DanglingTarget { .. }))),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(repo.is_empty());
        assert!(s.identity().is_draft());
        assert_eq!(s.store().snapshot(), before);
    }

    #[tokio::test]
    async fn test_save_falls_back_to_cache() {
        let repo = Arc::new(MemoryRepository::new());
        let cache = Arc::new(FallbackCache::in_memory().unwrap());
        let mut s = session(&repo).with_cache(cache.clone());
        add_chain(&mut s);
        repo.set_offline(true);

        let key = match s.save().await.unwrap() {
            SaveOutcome::Cached { key, reason } => {
                assert!(reason.contains("offline"));
                key
            }
            other => panic!("expected cached, got {:?}", other),
        };
        assert_eq!(key, s.identity().key());
        assert!(s.identity().is_draft());
        assert_eq!(s.store().nodes().len(), 2);

        // Back online: the save goes through and the parked entry is dropped.
        repo.set_offline(false);
        assert!(matches!(s.save().await.unwrap(), SaveOutcome::Persisted(_)));
        assert!(cache.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_save_succeeds_when_stale_entry_cannot_be_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fallback.db");
        let cache = Arc::new(FallbackCache::open(&path).unwrap());
        // Break the cache behind its back so the cleanup after saving fails.
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE cached_agents;")
            .unwrap();

        let repo = Arc::new(MemoryRepository::new());
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let mut s = EditorSession::new(repo.clone(), repo.clone(), bus).with_cache(cache);
        add_chain(&mut s);

        assert!(matches!(s.save().await.unwrap(), SaveOutcome::Persisted(_)));
        assert!(!s.identity().is_draft());
        assert_eq!(repo.len(), 1);
        assert!(matches!(
            events.try_recv().unwrap(),
            ForgeEvent::AgentSaved { created: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_transport_error_without_cache_surfaces() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(&repo);
        repo.set_offline(true);
        assert!(s.save().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_run_requires_saved_nonempty_agent() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(&repo);

        let err = s.run().await.unwrap_err();
        let ForgeError::Validation(report) = err else {
            panic!("expected validation error");
        };
        assert!(report.contains(&Violation::NotPersisted));
        assert!(report.contains(&Violation::NoNodes));

        add_chain(&mut s);
        s.save().await.unwrap();
        let ticket = s.run().await.unwrap();
        assert_eq!(ticket.status, "started");
    }

    #[tokio::test]
    async fn test_open_and_delete() {
        let repo = Arc::new(MemoryRepository::new());
        let mut s = session(&repo);
        add_chain(&mut s);
        s.save().await.unwrap();
        let id = s.identity().persisted_id().cloned().unwrap();
        let graph = s.store().snapshot();

        let mut other = session(&repo);
        other.open(&id).await.unwrap();
        assert_eq!(other.store().snapshot(), graph);

        other.delete().await.unwrap();
        assert!(other.identity().is_draft());
        assert_eq!(other.store().snapshot(), graph);
        assert!(matches!(s.delete().await, Err(ForgeError::NotFound(_))));
    }
}
