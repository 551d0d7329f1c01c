use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::{NodeOutput, TokenUsage};
use crate::domain::model::{Node, ProcessConfig};
use crate::error::{NodeError, NodeResult};
use crate::llm::executor::{build_messages, chat_request};
use crate::llm::{ChatContent, ChatMessage, ChatRole, ToolDefinition};
use crate::nodes::executor::{EngineServices, NodeProcessor};
use crate::nodes::utils::load_ai_config;

/// PROCESS processor used when a node has tool calling switched on.
///
/// Alternates model turns and tool calls for at most `max_rounds` model
/// turns. The last round is sent without tools so the model has to answer.
/// Tool failures are handed back to the model as the tool's result.
pub struct ToolProcessProcessor {
    services: Arc<EngineServices>,
    default_ai_config: Option<String>,
    max_rounds: usize,
}

impl ToolProcessProcessor {
    pub fn new(
        services: Arc<EngineServices>,
        default_ai_config: Option<String>,
        max_rounds: usize,
    ) -> Self {
        Self {
            services,
            default_ai_config,
            max_rounds,
        }
    }
}

#[async_trait]
impl NodeProcessor for ToolProcessProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let cfg: ProcessConfig = node.parse_config()?;
        let mut messages = build_messages(ctx, &cfg)?;
        let ai_config = load_ai_config(
            &self.services,
            cfg.ai_config_id.as_deref(),
            self.default_ai_config.as_deref(),
            ctx,
        )
        .await?;
        let ai = self.services.ai()?;
        let tools = self
            .services
            .tools
            .as_ref()
            .ok_or_else(|| NodeError::config("Tool calling enabled but no tool executor configured"))?;

        let tool_defs: Vec<ToolDefinition> = cfg
            .enabled_tools()
            .map(|t| ToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: if t.parameters.is_null() {
                    json!({"type": "object", "properties": {}})
                } else {
                    t.parameters.clone()
                },
            })
            .collect();
        ctx.step(
            "tools",
            format!(
                "Tool calling enabled with {} tool(s): {}",
                tool_defs.len(),
                tool_defs.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(", ")
            ),
        );

        let max_rounds = self.max_rounds.max(1);
        let mut total_usage = TokenUsage::default();
        let mut tool_call_log: Vec<Value> = Vec::new();
        let mut final_text = String::new();
        let mut model = ai_config.model.clone();
        let mut rounds = 0usize;

        for round in 0..max_rounds {
            let allow_tools = round + 1 < max_rounds;
            let mut request = chat_request(ai_config.clone(), &cfg, messages.clone());
            if allow_tools {
                request.tools = tool_defs.clone();
            }

            let response = ai.chat(request).await?;
            rounds += 1;
            total_usage.accumulate(&response.usage);
            model = response.model.clone();

            if response.tool_calls.is_empty() || !allow_tools {
                final_text = response.content;
                break;
            }

            messages.push(ChatMessage {
                role: ChatRole::Assistant,
                content: ChatContent::Text(response.content.clone()),
                tool_calls: response.tool_calls.clone(),
                tool_call_id: None,
            });

            for tool_call in &response.tool_calls {
                let known = tool_defs.iter().any(|t| t.name == tool_call.name);
                let (content, is_error) = if known {
                    match tools.call_tool(&tool_call.name, &tool_call.arguments).await {
                        Ok(output) => (output, false),
                        Err(e) => (e.to_string(), true),
                    }
                } else {
                    (format!("tool '{}' is not enabled for this node", tool_call.name), true)
                };

                if is_error {
                    ctx.warning(format!("Tool {} failed: {}", tool_call.name, content));
                } else {
                    ctx.step_with_data(
                        "tools",
                        format!("Tool {} returned {} chars", tool_call.name, content.len()),
                        json!({"arguments": tool_call.arguments}),
                    );
                }

                tool_call_log.push(json!({
                    "round": round,
                    "tool": &tool_call.name,
                    "arguments": &tool_call.arguments,
                    "result": &content,
                    "isError": is_error,
                }));
                messages.push(ChatMessage::tool_result(tool_call.id.clone(), content));
            }
        }

        ctx.success(format!(
            "Model finished after {} round(s) and {} tool call(s)",
            rounds,
            tool_call_log.len()
        ));

        Ok(NodeOutput::success(
            node,
            json!({
                "text": final_text,
                "model": model,
                "toolCalls": tool_call_log,
                "rounds": rounds,
            }),
            started_at,
            ctx.now(),
        )
        .with_token_usage(Some(total_usage)))
    }
}
