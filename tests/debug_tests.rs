use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use nodeflow::core::CallbackSink;
use nodeflow::error::ErrorCode;
use nodeflow::{
    ApprovalStatus, ApprovalStore, CodeSandbox, DebugRequest, DebugRunner, EngineConfig,
    EngineServices, ExecutionContext, InMemoryApprovalStore, LogEntry, LogLevel, Node, NodeError,
    NodeOutput, NodeProcessor, NodeResult, NodeStatus, NodeType, ProcessorRegistry, SandboxError,
    SandboxRequest, SandboxResult,
};

/// Logs two steps, then fails.
struct FailsHalfway;

#[async_trait]
impl NodeProcessor for FailsHalfway {
    async fn process(&self, _node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        ctx.step("fetch", "loaded 3 records");
        ctx.step("transform", "mapping fields");
        Err(NodeError::ExecutionError("field 'price' missing on record 2".into()))
    }
}

/// Logs once, then sleeps far longer than any test timeout.
struct Sleeper;

#[async_trait]
impl NodeProcessor for Sleeper {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started = ctx.now();
        ctx.step("wait", "waiting on a slow upstream");
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(NodeOutput::success(node, Value::Null, started, ctx.now()))
    }
}

struct MockSandbox {
    requests: Mutex<Vec<SandboxRequest>>,
}

#[async_trait]
impl CodeSandbox for MockSandbox {
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxResult, SandboxError> {
        self.requests.lock().unwrap().push(request.clone());
        if request.code.contains("undefinedThing") {
            return Err(SandboxError::ReferenceError("undefinedThing is not defined".into()));
        }
        let total = request.inputs["Cart"]["items"]
            .as_array()
            .map(|items| items.iter().filter_map(|i| i["price"].as_f64()).sum::<f64>())
            .unwrap_or(0.0);
        Ok(SandboxResult {
            output: json!({"total": total}),
            logs: vec![format!("summed {} bytes of code", request.code.len())],
            execution_time_ms: 3,
        })
    }
}

fn custom_runner() -> DebugRunner {
    let mut registry = ProcessorRegistry::empty();
    registry.register(NodeType::Data, Arc::new(FailsHalfway));
    registry.register(NodeType::Output, Arc::new(Sleeper));
    DebugRunner::new(Arc::new(registry), EngineConfig::default())
}

#[tokio::test]
async fn test_logs_survive_failure() {
    let node = Node::new("d1", NodeType::Data, "Import", Value::Null);
    let result = custom_runner().debug_node(DebugRequest::new(node)).await;

    assert_eq!(result.status, NodeStatus::Error);
    assert!(result.error.as_deref().unwrap().contains("price"));
    let steps: Vec<_> = result.logs.iter().filter_map(|l| l.step.as_deref()).collect();
    assert!(steps.contains(&"fetch"));
    assert!(steps.contains(&"transform"));
    assert_eq!(result.logs.last().unwrap().level, LogLevel::Error);
    assert_eq!(result.error_trace[0], result.error.clone().unwrap());
}

#[tokio::test]
async fn test_timeout_is_dedicated_error() {
    let node = Node::new("o1", NodeType::Output, "Report", Value::Null);
    let request = DebugRequest::new(node).with_timeout(Duration::from_millis(50));
    let result = custom_runner().debug_node(request).await;

    assert_eq!(result.status, NodeStatus::Error);
    assert!(result.error.as_deref().unwrap().contains("timed out"));
    let analysis = result.error_analysis.unwrap();
    assert_eq!(analysis.code, Some(ErrorCode::Timeout));
    assert!(analysis.is_retryable);
    assert!(result.logs.iter().any(|l| l.step.as_deref() == Some("wait")));
}

#[tokio::test]
async fn test_streaming_sink_sees_entries_in_order() {
    let seen: Arc<Mutex<Vec<LogEntry>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink = Arc::new(CallbackSink(move |entry: &LogEntry| {
        sink_seen.lock().unwrap().push(entry.clone());
    }));

    let node = Node::new("d1", NodeType::Data, "Import", Value::Null);
    let result = custom_runner()
        .debug_node_streaming(DebugRequest::new(node), sink)
        .await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), result.logs.len());
    assert_eq!(*seen, result.logs);
}

#[tokio::test]
async fn test_streaming_over_channel() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<LogEntry>();
    let node = Node::new("d1", NodeType::Data, "Import", Value::Null);
    let result = custom_runner()
        .debug_node_streaming(DebugRequest::new(node), Arc::new(tx))
        .await;

    let mut received = 0;
    while let Ok(entry) = rx.try_recv() {
        assert_eq!(entry, result.logs[received]);
        received += 1;
    }
    assert_eq!(received, result.logs.len());
}

#[tokio::test]
async fn test_condition_node_with_mocks() {
    let config = EngineConfig::default();
    let registry = Arc::new(ProcessorRegistry::new(EngineServices::new(), &config));
    let node = Node::new(
        "c1",
        NodeType::Condition,
        "Big order?",
        json!({
            "mode": "any",
            "conditions": [
                {"variable": "{{Order.total}}", "operator": "greaterThan", "value": 100},
                {"variable": "{{Order.vip}}", "operator": "equals", "value": true}
            ]
        }),
    );
    let request = DebugRequest::new(node).with_mock_output("Order", json!({"total": 40, "vip": true}));
    let result = DebugRunner::new(registry, config).debug_node(request).await;

    assert!(result.is_success());
    assert_eq!(result.output["branch"], json!("true"));
    assert_eq!(result.output["conditions"][0]["result"], json!(false));
}

#[tokio::test]
async fn test_code_node_through_sandbox() {
    let sandbox = Arc::new(MockSandbox {
        requests: Mutex::new(Vec::new()),
    });
    let config = EngineConfig::default();
    let services = EngineServices::new().with_sandbox(sandbox.clone());
    let runner = DebugRunner::new(Arc::new(ProcessorRegistry::new(services, &config)), config);

    let node = Node::new(
        "k1",
        NodeType::Code,
        "Sum",
        json!({"code": "return inputs.Cart.items.reduce((a, i) => a + i.price, 0) // {{Cart.currency}}"}),
    );
    let request = DebugRequest::new(node).with_mock_output(
        "Cart",
        json!({"currency": "EUR", "items": [{"price": 2.5}, {"price": 4}]}),
    );
    let result = runner.debug_node(request).await;

    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(result.output["result"]["total"], json!(6.5));
    let requests = sandbox.requests.lock().unwrap();
    assert!(requests[0].code.ends_with("// EUR"));
}

#[tokio::test]
async fn test_code_error_is_classified() {
    let sandbox = Arc::new(MockSandbox {
        requests: Mutex::new(Vec::new()),
    });
    let config = EngineConfig::default();
    let services = EngineServices::new().with_sandbox(sandbox);
    let runner = DebugRunner::new(Arc::new(ProcessorRegistry::new(services, &config)), config);

    let node = Node::new("k1", NodeType::Code, "Broken", json!({"code": "return undefinedThing"}));
    let result = runner.debug_node(DebugRequest::new(node)).await;

    assert_eq!(result.status, NodeStatus::Error);
    let analysis = result.error_analysis.unwrap();
    assert_eq!(analysis.code, Some(ErrorCode::CodeReferenceError));
    assert!(!analysis.is_retryable);
}

#[tokio::test]
async fn test_approval_is_paused_outcome() {
    let store = Arc::new(InMemoryApprovalStore::new());
    let config = EngineConfig::default();
    let services = EngineServices::new().with_approval_store(store.clone());
    let runner = DebugRunner::new(Arc::new(ProcessorRegistry::new(services, &config)), config);

    let node = Node::new(
        "a1",
        NodeType::Approval,
        "Sign-off",
        json!({"title": "Ship release?", "approvers": ["release-manager"]}),
    );
    let result = runner.debug_node(DebugRequest::new(node)).await;

    assert_eq!(result.status, NodeStatus::Paused);
    assert!(result.is_paused());
    let id = result.approval_request_id.unwrap();
    let stored = store.get_request(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, ApprovalStatus::Pending);
    assert_eq!(stored.title, "Ship release?");
}

#[tokio::test]
async fn test_missing_collaborator_is_config_error() {
    let config = EngineConfig::default();
    let runner = DebugRunner::new(Arc::new(ProcessorRegistry::new(EngineServices::new(), &config)), config);
    let node = Node::new("p1", NodeType::Process, "Ask", json!({"userPrompt": "hi"}));
    let result = runner.debug_node(DebugRequest::new(node)).await;

    assert_eq!(result.status, NodeStatus::Error);
    assert_eq!(result.error_analysis.unwrap().code, Some(ErrorCode::ConfigError));
}
