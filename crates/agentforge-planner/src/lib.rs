//! Natural-language workflow generation.
//!
//! `classify` reads a free-text request once and records what it found in an
//! `Intent`. The starter graph and the human-readable summary are both derived
//! from that intent, so they can never disagree. `ProgressScript` plays the
//! cosmetic "thinking" messages shown while a workflow is generated.

pub mod intent;
pub mod progress;

pub use intent::{classify, plan, ActionStep, Cadence, Intent, Plan, PlanSummary, TriggerChoice};
pub use progress::{ProgressScript, ProgressStep, PROGRESS_STEPS};
