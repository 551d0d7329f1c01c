use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{Node, ProcessConfig};
use crate::error::{NodeError, NodeResult};
use crate::nodes::executor::{EngineServices, NodeProcessor};
use crate::nodes::utils::{load_ai_config, render_field};

use super::types::{AiConfig, ChatMessage, ChatRequest};

/// PROCESS node processor: one chat completion over the rendered prompts.
pub struct ProcessNodeProcessor {
    services: Arc<EngineServices>,
    default_ai_config: Option<String>,
}

impl ProcessNodeProcessor {
    pub fn new(services: Arc<EngineServices>, default_ai_config: Option<String>) -> Self {
        Self {
            services,
            default_ai_config,
        }
    }
}

/// Render the system and user prompts into the opening messages.
pub(crate) fn build_messages(
    ctx: &mut ExecutionContext,
    config: &ProcessConfig,
) -> NodeResult<Vec<ChatMessage>> {
    if config.user_prompt.trim().is_empty() {
        return Err(NodeError::config("PROCESS node requires a userPrompt"));
    }
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = config.system_prompt.as_deref().filter(|s| !s.trim().is_empty()) {
        messages.push(ChatMessage::system(render_field(ctx, "systemPrompt", system)));
    }
    messages.push(ChatMessage::user(render_field(ctx, "userPrompt", &config.user_prompt)));
    Ok(messages)
}

/// Node settings win over the stored configuration.
pub(crate) fn chat_request(
    ai_config: AiConfig,
    config: &ProcessConfig,
    messages: Vec<ChatMessage>,
) -> ChatRequest {
    ChatRequest {
        temperature: config.temperature.or(ai_config.temperature),
        max_tokens: config.max_tokens.or(ai_config.max_tokens),
        config: ai_config,
        messages,
        tools: vec![],
    }
}

#[async_trait]
impl NodeProcessor for ProcessNodeProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: ProcessConfig = node.parse_config()?;
        let messages = build_messages(ctx, &config)?;
        let ai_config = load_ai_config(
            &self.services,
            config.ai_config_id.as_deref(),
            self.default_ai_config.as_deref(),
            ctx,
        )
        .await?;
        let ai = self.services.ai()?;

        ctx.step_with_data(
            "ai",
            format!("Calling {} / {}", ai_config.provider, ai_config.model),
            json!({"messages": messages.len()}),
        );
        let response = ai.chat(chat_request(ai_config, &config, messages)).await?;
        ctx.success(format!(
            "Model responded with {} chars ({} tokens)",
            response.content.chars().count(),
            response.usage.total_tokens
        ));

        Ok(NodeOutput::success(
            node,
            json!({
                "text": response.content,
                "model": response.model,
                "finishReason": response.finish_reason,
            }),
            started_at,
            ctx.now(),
        )
        .with_token_usage(Some(response.usage)))
    }
}
