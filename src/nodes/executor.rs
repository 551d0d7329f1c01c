use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::approval::ApprovalStore;
use crate::config::EngineConfig;
use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{Node, NodeType, ProcessConfig};
use crate::error::{NodeError, NodeResult};
use crate::llm::{AiConfigStore, AiService, ToolExecutor};
use crate::sandbox::CodeSandbox;

/// Trait for node processing. Each node type implements this.
#[async_trait]
pub trait NodeProcessor: Send + Sync {
    /// Run the node against the context and return its output.
    ///
    /// Implementations may log to and read from `ctx`, but must not insert
    /// their own output; the caller does that once `process` returns.
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput>;
}

/// External collaborators shared by the built-in processors.
///
/// Any of them may be absent; a processor that needs a missing one fails
/// with a configuration error when it runs.
#[derive(Clone, Default)]
pub struct EngineServices {
    pub ai: Option<Arc<dyn AiService>>,
    pub ai_configs: Option<Arc<dyn AiConfigStore>>,
    pub tools: Option<Arc<dyn ToolExecutor>>,
    pub sandbox: Option<Arc<dyn CodeSandbox>>,
    pub approvals: Option<Arc<dyn ApprovalStore>>,
}

impl EngineServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ai_service(mut self, ai: Arc<dyn AiService>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_ai_config_store(mut self, store: Arc<dyn AiConfigStore>) -> Self {
        self.ai_configs = Some(store);
        self
    }

    pub fn with_tool_executor(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_sandbox(mut self, sandbox: Arc<dyn CodeSandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    pub fn with_approval_store(mut self, approvals: Arc<dyn ApprovalStore>) -> Self {
        self.approvals = Some(approvals);
        self
    }

    pub fn ai(&self) -> NodeResult<&Arc<dyn AiService>> {
        self.ai
            .as_ref()
            .ok_or_else(|| NodeError::config("No AI service configured"))
    }

    pub fn ai_configs(&self) -> NodeResult<&Arc<dyn AiConfigStore>> {
        self.ai_configs
            .as_ref()
            .ok_or_else(|| NodeError::config("No AI config store configured"))
    }

    pub fn sandbox(&self) -> NodeResult<&Arc<dyn CodeSandbox>> {
        self.sandbox
            .as_ref()
            .ok_or_else(|| NodeError::config("No code sandbox configured"))
    }

    pub fn approvals(&self) -> NodeResult<&Arc<dyn ApprovalStore>> {
        self.approvals
            .as_ref()
            .ok_or_else(|| NodeError::config("No approval store configured"))
    }
}

/// Registry of node processors by node type
pub struct ProcessorRegistry {
    processors: HashMap<NodeType, Arc<dyn NodeProcessor>>,
    tool_processor: Option<Arc<dyn NodeProcessor>>,
}

impl ProcessorRegistry {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        ProcessorRegistry {
            processors: HashMap::new(),
            tool_processor: None,
        }
    }

    /// A registry holding the built-in processor for every node type.
    pub fn new(services: EngineServices, config: &EngineConfig) -> Self {
        let services = Arc::new(services);
        let default_ai = config.default_ai_config_id.clone();
        let mut registry = Self::empty();

        registry.register(NodeType::Input, Arc::new(super::control_flow::InputProcessor));
        registry.register(
            NodeType::Process,
            Arc::new(crate::llm::ProcessNodeProcessor::new(
                services.clone(),
                default_ai.clone(),
            )),
        );
        registry.register(
            NodeType::Code,
            Arc::new(super::data_transform::CodeProcessor::new(services.clone())),
        );
        registry.register(NodeType::Output, Arc::new(super::control_flow::OutputProcessor));
        registry.register(
            NodeType::Condition,
            Arc::new(super::control_flow::ConditionProcessor),
        );
        registry.register(
            NodeType::Loop,
            Arc::new(super::flow::LoopProcessor::new(config.max_loop_iterations)),
        );
        registry.register(NodeType::Data, Arc::new(super::data_transform::DataProcessor));
        for media in [NodeType::Image, NodeType::Audio, NodeType::Video] {
            registry.register(
                media,
                Arc::new(crate::llm::MediaProcessor::new(
                    media,
                    services.clone(),
                    default_ai.clone(),
                )),
            );
        }
        registry.register(
            NodeType::Approval,
            Arc::new(super::human_input::ApprovalProcessor::new(services.clone())),
        );
        registry.set_tool_processor(Arc::new(super::agent::ToolProcessProcessor::new(
            services,
            default_ai,
            config.max_tool_rounds,
        )));
        registry
    }

    pub fn register(&mut self, node_type: NodeType, processor: Arc<dyn NodeProcessor>) {
        self.processors.insert(node_type, processor);
    }

    /// Processor substituted for PROCESS nodes that use tools.
    pub fn set_tool_processor(&mut self, processor: Arc<dyn NodeProcessor>) {
        self.tool_processor = Some(processor);
    }

    pub fn get(&self, node_type: NodeType) -> Option<&Arc<dyn NodeProcessor>> {
        self.processors.get(&node_type)
    }

    /// Pick the processor for one dispatch.
    ///
    /// A PROCESS node whose configuration enables tool calling, or lists at
    /// least one enabled tool, goes to the tool processor instead of the
    /// static entry. Checked on every call.
    pub fn resolve(&self, node: &Node) -> NodeResult<Arc<dyn NodeProcessor>> {
        if node.node_type == NodeType::Process && Self::uses_tools(node) {
            if let Some(tool_processor) = &self.tool_processor {
                tracing::debug!(node_id = %node.id, "dispatching to tool-aware processor");
                return Ok(tool_processor.clone());
            }
        }
        self.processors
            .get(&node.node_type)
            .cloned()
            .ok_or_else(|| NodeError::ExecutorNotFound(node.node_type.to_string()))
    }

    /// Run `node` and insert its output into `ctx`.
    ///
    /// A processor error becomes an `error` output carrying the first
    /// `trace_lines` lines of the error chain; nothing else in the context
    /// is touched.
    pub async fn execute(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
        trace_lines: usize,
    ) -> NodeOutput {
        let started_at = ctx.now();
        let result = match self.resolve(node) {
            Ok(processor) => processor.process(node, ctx).await,
            Err(e) => Err(e),
        };
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let trace = err.trace_lines(trace_lines);
                tracing::warn!(
                    node_id = %node.id,
                    node_type = %node.node_type,
                    error = %err,
                    "node failed"
                );
                ctx.error(format!("{} failed: {}", node.name, err));
                NodeOutput::failure(node, trace.join("\n"), started_at, ctx.now())
            }
        };
        ctx.set_node_output(output.clone());
        output
    }

    fn uses_tools(node: &Node) -> bool {
        node.parse_config::<ProcessConfig>()
            .map(|cfg| cfg.wants_tools())
            .unwrap_or(false)
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new(EngineServices::default(), &EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Value};

    struct Tagged(&'static str);

    #[async_trait]
    impl NodeProcessor for Tagged {
        async fn process(&self, node: &Node, _ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
            let now = Utc::now();
            Ok(NodeOutput::success(node, json!(self.0), now, now))
        }
    }

    fn registry() -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::empty();
        registry.register(NodeType::Process, Arc::new(Tagged("plain")));
        registry.set_tool_processor(Arc::new(Tagged("tools")));
        registry
    }

    async fn dispatch(registry: &ProcessorRegistry, config: Value) -> Value {
        let node = Node::new("p1", NodeType::Process, "Ask", config);
        let mut ctx = ExecutionContext::new("e1", "w1");
        let processor = registry.resolve(&node).unwrap();
        processor.process(&node, &mut ctx).await.unwrap().data
    }

    #[tokio::test]
    async fn test_plain_process_dispatch() {
        let r = registry();
        assert_eq!(dispatch(&r, json!({"userPrompt": "hi"})).await, json!("plain"));
    }

    #[tokio::test]
    async fn test_tool_override_by_flag() {
        let r = registry();
        let cfg = json!({"userPrompt": "hi", "enableToolCalling": true});
        assert_eq!(dispatch(&r, cfg).await, json!("tools"));
    }

    #[tokio::test]
    async fn test_tool_override_by_enabled_tool() {
        let r = registry();
        let cfg = json!({"userPrompt": "hi", "tools": [{"name": "search"}]});
        assert_eq!(dispatch(&r, cfg).await, json!("tools"));
        let cfg = json!({"userPrompt": "hi", "tools": [{"name": "search", "enabled": false}]});
        assert_eq!(dispatch(&r, cfg).await, json!("plain"));
    }

    #[test]
    fn test_unregistered_type() {
        let r = registry();
        let node = Node::new("c1", NodeType::Code, "Script", Value::Null);
        assert!(matches!(r.resolve(&node), Err(NodeError::ExecutorNotFound(_))));
    }

    #[tokio::test]
    async fn test_execute_records_failure_output() {
        let r = registry();
        let node = Node::new("c1", NodeType::Code, "Script", Value::Null);
        let mut ctx = ExecutionContext::new("e1", "w1");
        let out = r.execute(&node, &mut ctx, 5).await;

        assert_eq!(out.status, crate::domain::execution::NodeStatus::Error);
        assert!(out.error.unwrap().contains("CODE"));
        assert!(ctx.node_output("Script").is_some());
        assert!(!ctx.logs().is_empty());
    }

    #[tokio::test]
    async fn test_execute_inserts_success_output() {
        let r = registry();
        let node = Node::new("p1", NodeType::Process, "Ask", json!({"userPrompt": "hi"}));
        let mut ctx = ExecutionContext::new("e1", "w1");
        r.execute(&node, &mut ctx, 5).await;
        assert_eq!(ctx.node_output("Ask").unwrap().data, json!("plain"));
    }

    #[test]
    fn test_builtins_cover_every_type() {
        let r = ProcessorRegistry::default();
        for node_type in NodeType::ALL {
            assert!(r.get(node_type).is_some(), "missing processor for {}", node_type);
        }
    }
}
