use serde::Serialize;

use crate::execution::ExecutionRecord;
use crate::types::AgentId;

/// Lifecycle events observed by the CLI and tests.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForgeEvent {
    /// Cosmetic progress message while a workflow is generated.
    PlanningStep {
        index: usize,
        total: usize,
        message: String,
    },
    AgentSaved {
        agent_id: AgentId,
        name: String,
        created: bool,
    },
    /// Save fell back to the local cache.
    AgentCached {
        key: String,
        reason: String,
    },
    AgentDeleted {
        agent_id: AgentId,
    },
    ExecutionStarted {
        agent_id: AgentId,
        status: String,
    },
    ExecutionsUpdated {
        agent_id: AgentId,
        records: Vec<ExecutionRecord>,
    },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
#[derive(Clone)]
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<ForgeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ForgeEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ForgeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_subscribers_receive() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(ForgeEvent::AgentDeleted {
            agent_id: AgentId::from("a1"),
        });

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                ForgeEvent::AgentDeleted { agent_id } => assert_eq!(agent_id.as_str(), "a1"),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new(4);
        bus.publish(ForgeEvent::PlanningStep {
            index: 1,
            total: 5,
            message: "Understanding your request...".into(),
        });
    }

    #[test]
    fn test_event_json_tag() {
        let json = serde_json::to_value(ForgeEvent::AgentCached {
            key: "agent_1".into(),
            reason: "down".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "agent_cached");
    }
}
