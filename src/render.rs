//! Terminal output for the CLI commands.

use agentforge_client::FlushReport;
use agentforge_core::execution::format_duration;
use agentforge_core::{Agent, ExecutionRecord, NodeTemplate, ValidationReport};
use agentforge_planner::PlanSummary;

pub fn templates() {
    for template in NodeTemplate::ALL {
        println!(
            "  {:<10} {:<17} {:<14} {}",
            template.kind().to_string(),
            template.label(),
            template.default_config().template_name(),
            template.description()
        );
    }
}

pub fn plan(summary: &PlanSummary, agent: &Agent) {
    println!();
    println!("Agent:    {}", summary.name);
    println!("Trigger:  {} ({})", summary.trigger, summary.timing);
    if summary.actions.is_empty() {
        println!("Actions:  none detected");
    } else {
        println!("Actions:  {}", summary.actions.join(", "));
    }
    if summary.condition {
        println!("Condition: yes");
    }
    println!();
    for node in &agent.graph.nodes {
        println!("  {:<14} {:<10} {}", node.id.as_str(), node.kind().to_string(), node.label);
    }
    for edge in &agent.graph.edges {
        println!("  {} -> {}", edge.source, edge.target);
    }
}

pub fn agent_list(agents: &[Agent]) {
    if agents.is_empty() {
        println!("No agents yet.");
        return;
    }
    for agent in agents {
        println!(
            "{:<26} {:<7} {:>3} nodes  {}",
            agent.identity.key(),
            agent.status.to_string(),
            agent.graph.nodes.len(),
            agent.name
        );
    }
}

pub fn executions(records: &[ExecutionRecord]) {
    if records.is_empty() {
        println!("No executions yet.");
        return;
    }
    for record in records {
        println!(
            "{}  {:<9} {}  {}",
            record.id,
            record.status.to_string(),
            record.start_time.format("%Y-%m-%d %H:%M:%S"),
            format_duration(record.duration_ms)
        );
        for log in &record.logs {
            println!(
                "    {} {:<5} {}",
                log.timestamp.format("%H:%M:%S"),
                log.level.to_string(),
                log.message
            );
        }
        for outcome in &record.results {
            println!(
                "    {} ({}): {}",
                outcome.node_label, outcome.node_id, outcome.result
            );
        }
        if let Some(error) = record.failure() {
            println!("    error: {}", error);
        }
    }
}

pub fn report(stage: &str, report: &ValidationReport) {
    if report.is_ok() {
        println!("ready for {}", stage);
        return;
    }
    println!("not ready for {}:", stage);
    for violation in &report.violations {
        println!("  - {}", violation);
    }
}

pub fn flush_report(report: &FlushReport) {
    for (key, id) in &report.synced {
        println!("synced  {} -> {}", key, id);
    }
    for (key, error) in &report.failed {
        println!("failed  {}: {}", key, error);
    }
}
