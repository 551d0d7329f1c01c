use std::sync::Arc;

use nodeflow::{DebugRequest, DebugRunner, EngineConfig, Node, NodeType, ProcessorRegistry};
use serde_json::json;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== nodeflow debug runner ===\n");

    let config = EngineConfig::from_env();
    let registry = Arc::new(ProcessorRegistry::new(Default::default(), &config));
    let runner = DebugRunner::new(registry, config);

    let node = Node::new(
        "cond-1",
        NodeType::Condition,
        "Qualified?",
        json!({
            "mode": "all",
            "conditions": [
                {"variable": "{{Lead.score}}", "operator": "greaterOrEqual", "value": 70},
                {"variable": "{{Lead.email}}", "operator": "isNotEmpty"},
                {"variable": "{{Lead.company}}", "operator": "endsWith", "value": "Inc"}
            ]
        }),
    );

    let request = DebugRequest::new(node).with_mock_output(
        "Lead",
        json!({"score": 82, "email": "ada@example.com", "company": "Analytical Engines Inc"}),
    );

    let result = runner.debug_node(request).await;

    println!("status   = {}", result.status);
    println!("duration = {}ms", result.duration);
    println!("output   = {}", result.output);
    if let Some(error) = &result.error {
        println!("error    = {}", error);
    }

    println!("\n--- logs ---");
    for entry in &result.logs {
        let step = entry.step.as_deref().unwrap_or("-");
        println!(
            "{} [{:?}] ({}) {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.level,
            step,
            entry.message
        );
    }
}
