//! Single-node debug harness.
//!
//! [`DebugRunner`] runs one node in isolation. It builds a fresh
//! [`ExecutionContext`], seeds it with mocked upstream outputs, picks the
//! processor through the registry and races it against a timeout. Whatever
//! happens, the log trail recorded up to that point is handed back.
//!
//! Timeouts drop the processor future, so a node that overruns stops doing
//! work at its next suspension point instead of running on in the
//! background.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::execution_context::{ExecutionContext, ImportedFile, LogEntry, LogLevel, LogSink};
use super::redact::{KeyRedactor, Redactor};
use super::runtime_context::RuntimeContext;
use crate::config::EngineConfig;
use crate::domain::execution::{NodeOutput, NodeStatus, TokenUsage};
use crate::domain::model::{Node, NodeType};
use crate::error::{analyze_error, analyze_node_error, ErrorAnalysis, NodeError, NodeResult};
use crate::nodes::executor::ProcessorRegistry;

/// Everything needed to debug-run one node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugRequest {
    pub node: Node,
    /// Upstream node name to the data that node would have produced.
    #[serde(default)]
    pub mock_outputs: Map<String, Value>,
    #[serde(default)]
    pub global_variables: Map<String, Value>,
    #[serde(default)]
    pub imported_files: Vec<ImportedFile>,
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default = "default_workflow_id")]
    pub workflow_id: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Overrides the configured debug timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_workflow_id() -> String {
    "debug".to_string()
}

impl DebugRequest {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            mock_outputs: Map::new(),
            global_variables: Map::new(),
            imported_files: Vec::new(),
            execution_id: None,
            workflow_id: default_workflow_id(),
            organization_id: None,
            user_id: None,
            timeout_ms: None,
        }
    }

    pub fn with_mock_output(mut self, node_name: impl Into<String>, data: Value) -> Self {
        self.mock_outputs.insert(node_name.into(), data);
        self
    }

    pub fn with_global_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.global_variables.insert(name.into(), value);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }
}

/// Outcome of a debug run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugResult {
    pub status: NodeStatus,
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Message plus the first lines of the error chain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_trace: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_analysis: Option<ErrorAnalysis>,
    /// Milliseconds.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    pub logs: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<String>,
}

impl DebugResult {
    pub fn is_success(&self) -> bool {
        self.status == NodeStatus::Success
    }

    /// A run that stopped at an approval gate.
    pub fn is_paused(&self) -> bool {
        self.approval_request_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}

pub struct DebugRunner {
    registry: Arc<ProcessorRegistry>,
    config: EngineConfig,
    runtime: RuntimeContext,
    redactor: Arc<dyn Redactor>,
}

impl DebugRunner {
    pub fn new(registry: Arc<ProcessorRegistry>, config: EngineConfig) -> Self {
        Self {
            registry,
            config,
            runtime: RuntimeContext::default(),
            redactor: Arc::new(KeyRedactor::default()),
        }
    }

    pub fn with_runtime(mut self, runtime: RuntimeContext) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_redactor(mut self, redactor: Arc<dyn Redactor>) -> Self {
        self.redactor = redactor;
        self
    }

    pub async fn debug_node(&self, request: DebugRequest) -> DebugResult {
        self.run(request, None).await
    }

    /// Like [`debug_node`](Self::debug_node), also pushing every log entry
    /// to `sink` the moment it is recorded.
    pub async fn debug_node_streaming(
        &self,
        request: DebugRequest,
        sink: Arc<dyn LogSink>,
    ) -> DebugResult {
        self.run(request, Some(sink)).await
    }

    fn build_context(&self, request: &DebugRequest, sink: Option<Arc<dyn LogSink>>) -> ExecutionContext {
        let execution_id = request
            .execution_id
            .clone()
            .unwrap_or_else(|| format!("debug-{}", self.runtime.next_id()));
        let mut ctx = ExecutionContext::new(execution_id, request.workflow_id.clone())
            .with_runtime(self.runtime.clone())
            .with_redactor(self.redactor.clone())
            .with_global_variables(request.global_variables.clone())
            .with_imported_files(request.imported_files.clone());
        if let Some(org) = &request.organization_id {
            ctx = ctx.with_organization(org.clone());
        }
        if let Some(user) = &request.user_id {
            ctx = ctx.with_user(user.clone());
        }
        if let Some(sink) = sink {
            ctx = ctx.with_log_sink(sink);
        }
        ctx
    }

    async fn run(&self, request: DebugRequest, sink: Option<Arc<dyn LogSink>>) -> DebugResult {
        let node = &request.node;
        let mut ctx = self.build_context(&request, sink);
        let started_at = ctx.now();

        ctx.info(format!("Debugging {} node \"{}\"", node.node_type, node.name));
        let seed_at = ctx.now();
        for (name, data) in &request.mock_outputs {
            ctx.step_with_data("seed", format!("Seeded mock output for \"{}\"", name), data.clone());
            ctx.set_node_output(NodeOutput::seeded(name.clone(), NodeType::Data, data.clone(), seed_at));
        }

        let timeout = request
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.debug_timeout());

        let outcome = self.race(node, &mut ctx, timeout).await;
        let completed_at = ctx.now().max(started_at);
        let duration = (completed_at - started_at).num_milliseconds();

        match outcome {
            Ok(output) => {
                match output.status {
                    NodeStatus::Paused => ctx.info(format!(
                        "Node paused awaiting approval {}",
                        output.approval_request_id.as_deref().unwrap_or_default()
                    )),
                    NodeStatus::Error => ctx.error(format!(
                        "Node reported an error: {}",
                        output.error.as_deref().unwrap_or("unknown error")
                    )),
                    _ => ctx.success(format!("Node finished in {}ms", duration)),
                }
                let error_analysis = output
                    .error
                    .as_deref()
                    .map(|e| analyze_error(e, Some(node.node_type)));
                DebugResult {
                    status: output.status,
                    output: output.data,
                    error: output.error,
                    error_trace: Vec::new(),
                    error_analysis,
                    duration,
                    token_usage: output.token_usage,
                    logs: ctx.take_logs(),
                    approval_request_id: output.approval_request_id,
                }
            }
            Err(err) => {
                let trace = err.trace_lines(self.config.error_trace_lines);
                tracing::warn!(
                    node_id = %node.id,
                    node_type = %node.node_type,
                    error = %err,
                    "debug run failed"
                );
                ctx.log_with_data(
                    LogLevel::Error,
                    format!("Node failed: {}", err),
                    json!({ "trace": trace }),
                );
                DebugResult {
                    status: NodeStatus::Error,
                    output: Value::Null,
                    error: Some(err.to_string()),
                    error_analysis: Some(analyze_node_error(&err, Some(node.node_type))),
                    error_trace: trace,
                    duration,
                    token_usage: None,
                    logs: ctx.take_logs(),
                    approval_request_id: None,
                }
            }
        }
    }

    async fn race(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
        timeout: Duration,
    ) -> NodeResult<NodeOutput> {
        let processor = self.registry.resolve(node)?;
        ctx.step(
            "dispatch",
            format!("Running with a {}ms timeout", timeout.as_millis()),
        );
        match tokio::time::timeout(timeout, processor.process(node, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::Timeout(timeout)),
        }
    }
}
