use std::sync::Arc;
use std::time::Duration;

use agentforge_core::{EventBus, ForgeEvent};
use tracing::debug;

/// One cosmetic "thinking" message and how long to wait before showing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressStep {
    pub message: &'static str,
    pub delay: Duration,
}

const fn step(message: &'static str, millis: u64) -> ProgressStep {
    ProgressStep {
        message,
        delay: Duration::from_millis(millis),
    }
}

/// The scripted sequence played while a workflow is generated. Not tied to
/// any real progress.
pub const PROGRESS_STEPS: [ProgressStep; 5] = [
    step("Understanding your request...", 800),
    step("Identifying data sources...", 1000),
    step("Designing workflow...", 1200),
    step("Creating AI agent...", 1000),
    step("Agent ready!", 500),
];

/// Publishes `PROGRESS_STEPS` as `ForgeEvent::PlanningStep` events.
pub struct ProgressScript {
    event_bus: Arc<EventBus>,
    simulate_delays: bool,
}

impl ProgressScript {
    pub fn new(event_bus: Arc<EventBus>, simulate_delays: bool) -> Self {
        Self {
            event_bus,
            simulate_delays,
        }
    }

    /// Total time the script takes when delays are simulated.
    pub fn duration(&self) -> Duration {
        if self.simulate_delays {
            PROGRESS_STEPS.iter().map(|s| s.delay).sum()
        } else {
            Duration::ZERO
        }
    }

    /// Play every step in order, sleeping before each one.
    pub async fn run(&self) {
        let total = PROGRESS_STEPS.len();
        for (i, step) in PROGRESS_STEPS.iter().enumerate() {
            if self.simulate_delays {
                tokio::time::sleep(step.delay).await;
            }
            debug!(step = i + 1, total, message = step.message, "Planning step");
            self.event_bus.publish(ForgeEvent::PlanningStep {
                index: i + 1,
                total,
                message: step.message.to_string(),
            });
        }
    }
}
