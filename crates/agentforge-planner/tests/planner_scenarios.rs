//! Generator scenarios and progress script timing.

use std::sync::Arc;
use std::time::Duration;

use agentforge_core::graph::NodeConfig;
use agentforge_core::{EventBus, ForgeEvent, NodeKind};
use agentforge_planner::{classify, plan, ProgressScript, PROGRESS_STEPS};
use proptest::prelude::*;

fn templates(text: &str) -> Vec<&'static str> {
    classify(text)
        .unwrap()
        .graph()
        .nodes
        .iter()
        .map(|n| n.config.template_name())
        .collect()
}

#[test]
fn daily_digest() {
    let intent = classify("Email me a summary every day").unwrap();
    let graph = intent.graph();

    assert_eq!(templates("Email me a summary every day"), ["scheduleTrigger", "sendEmail"]);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].source.as_str(), "trigger-1");
    assert_eq!(graph.edges[0].target.as_str(), "action-email");
    assert!(graph.nodes.iter().all(|n| n.kind() != NodeKind::Condition));

    match &graph.nodes[0].config {
        NodeConfig::ScheduleTrigger { schedule, .. } => assert_eq!(schedule, "Daily"),
        other => panic!("unexpected trigger config: {:?}", other),
    }
}

#[test]
fn conditional_alert() {
    let text = "Track competitor prices daily and alert if they drop";
    let graph = classify(text).unwrap().graph();

    assert_eq!(templates(text), ["scheduleTrigger", "ifElse"]);
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].id.as_str(), "e-trigger-1-condition-1");
}

#[test]
fn webhook_default() {
    let graph = classify("Notify me on new signups").unwrap().graph();
    assert_eq!(graph.nodes[0].config.template_name(), "webhookTrigger");
    assert_eq!(graph.entry_points().len(), 1);
}

#[test]
fn generated_graph_is_valid_under_strict_policy() {
    use agentforge_core::{AgentId, Validator};

    for text in [
        "Email me a summary every day",
        "Track competitor prices daily and alert if they drop",
        "Notify me on new signups",
        "Every evening fetch data from the API, analyze it and send a report",
    ] {
        let mut agent = plan(text).unwrap().agent;
        agent.mark_persisted(AgentId::from("generated"));
        let report = Validator::default().check_execution(&agent);
        assert!(report.is_ok(), "{}: {}", text, report);
    }
}

#[tokio::test(start_paused = true)]
async fn progress_script_follows_fixed_delays() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let script = ProgressScript::new(bus.clone(), true);

    let start = tokio::time::Instant::now();
    script.run().await;
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(4500), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(4600), "{:?}", elapsed);

    let mut messages = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ForgeEvent::PlanningStep { message, index, total } = event {
            assert_eq!(total, PROGRESS_STEPS.len());
            assert_eq!(index, messages.len() + 1);
            messages.push(message);
        }
    }
    assert_eq!(messages.first().map(String::as_str), Some("Understanding your request..."));
    assert_eq!(messages.last().map(String::as_str), Some("Agent ready!"));
    assert_eq!(messages.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn progress_script_without_delays() {
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let start = tokio::time::Instant::now();
    ProgressScript::new(bus.clone(), false).run().await;
    assert_eq!(start.elapsed(), Duration::ZERO);

    let mut count = 0;
    while rx.try_recv().is_ok() {
        count += 1;
    }
    assert_eq!(count, PROGRESS_STEPS.len());
}

proptest! {
    #[test]
    fn generation_is_deterministic(text in "[a-zA-Z ]{1,60}") {
        prop_assume!(!text.trim().is_empty());
        let first = plan(&text).unwrap();
        let second = plan(&text).unwrap();
        prop_assert_eq!(first.agent.graph, second.agent.graph);
        prop_assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn exactly_one_trigger_and_a_chain(text in "[a-z ]{1,80}") {
        prop_assume!(!text.trim().is_empty());
        let graph = classify(&text).unwrap().graph();
        let triggers = graph.nodes.iter().filter(|n| n.is_trigger()).count();
        prop_assert_eq!(triggers, 1);
        prop_assert_eq!(graph.edges.len(), graph.nodes.len() - 1);
        prop_assert!(graph.nodes.len() <= 5);
    }
}
