use std::sync::Arc;
use std::time::Duration;

use agentforge_core::{AgentId, EventBus, ExecutionGateway, ExecutionRecord, ForgeEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polls an agent's execution records on a fixed interval.
pub struct ExecutionWatcher {
    gateway: Arc<dyn ExecutionGateway>,
    event_bus: Arc<EventBus>,
    interval: Duration,
}

/// A running watch. Dropping it without `close` leaves the task to stop on
/// its own once the receiver is gone.
pub struct WatchHandle {
    rx: mpsc::Receiver<Vec<ExecutionRecord>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ExecutionWatcher {
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        event_bus: Arc<EventBus>,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            event_bus,
            interval,
        }
    }

    /// Start polling `agent_id`. The first poll happens immediately.
    pub fn watch(&self, agent_id: AgentId) -> WatchHandle {
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            self.gateway.clone(),
            self.event_bus.clone(),
            agent_id,
            self.interval,
            tx,
            cancel.clone(),
        ));
        WatchHandle { rx, cancel, task }
    }
}

async fn poll_loop(
    gateway: Arc<dyn ExecutionGateway>,
    event_bus: Arc<EventBus>,
    agent_id: AgentId,
    interval: Duration,
    tx: mpsc::Sender<Vec<ExecutionRecord>>,
    cancel: CancellationToken,
) {
    info!(agent_id = %agent_id, interval_secs = interval.as_secs(), "Execution watch started");
    loop {
        tokio::select! {
            result = gateway.executions(&agent_id) => match result {
                Ok(records) => {
                    debug!(agent_id = %agent_id, count = records.len(), "Executions polled");
                    event_bus.publish(ForgeEvent::ExecutionsUpdated {
                        agent_id: agent_id.clone(),
                        records: records.clone(),
                    });
                    // A full channel must not outlive cancellation.
                    tokio::select! {
                        sent = tx.send(records) => if sent.is_err() { break },
                        _ = cancel.cancelled() => break,
                    }
                }
                Err(e) => warn!(agent_id = %agent_id, error = %e, "Execution poll failed"),
            },
            _ = cancel.cancelled() => break,
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => break,
        }
    }
    info!(agent_id = %agent_id, "Execution watch stopped");
}

impl WatchHandle {
    /// Next snapshot, or `None` once the watch has stopped.
    pub async fn recv(&mut self) -> Option<Vec<ExecutionRecord>> {
        self.rx.recv().await
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop polling and wait for the task to finish.
    pub async fn close(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Execution watch task ended abnormally");
        }
    }
}
