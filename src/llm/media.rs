//! IMAGE, AUDIO and VIDEO node processing.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::{NodeOutput, TokenUsage};
use crate::domain::model::{MediaConfig, Node, NodeType};
use crate::error::{NodeError, NodeResult};
use crate::nodes::executor::{EngineServices, NodeProcessor};
use crate::nodes::utils::{load_ai_config, render_field};

use super::types::{
    AiConfig, ChatContent, ChatMessage, ChatRequest, ChatRole, ContentPart, TranscriptionRequest,
};

const DEFAULT_IMAGE_PROMPT: &str = "Describe this image in detail.";
const DEFAULT_VIDEO_PROMPT: &str = "Summarize this video based on its transcript.";

/// One processor per media node type, sharing the AI collaborators.
pub struct MediaProcessor {
    kind: NodeType,
    services: Arc<EngineServices>,
    default_ai_config: Option<String>,
}

impl MediaProcessor {
    pub fn new(
        kind: NodeType,
        services: Arc<EngineServices>,
        default_ai_config: Option<String>,
    ) -> Self {
        Self {
            kind,
            services,
            default_ai_config,
        }
    }

    async fn chat(&self, ai_config: AiConfig, message: ChatMessage) -> NodeResult<(String, TokenUsage)> {
        let request = ChatRequest {
            temperature: ai_config.temperature,
            max_tokens: ai_config.max_tokens,
            config: ai_config,
            messages: vec![message],
            tools: vec![],
        };
        let response = self.services.ai()?.chat(request).await?;
        Ok((response.content, response.usage))
    }

    async fn transcribe(
        &self,
        ai_config: AiConfig,
        file_url: &str,
        config: &MediaConfig,
        ctx: &mut ExecutionContext,
        usage: &mut TokenUsage,
    ) -> NodeResult<serde_json::Value> {
        ctx.step("transcribe", format!("Transcribing {}", file_url));
        let response = self
            .services
            .ai()?
            .transcribe(TranscriptionRequest {
                config: ai_config,
                file_url: file_url.to_string(),
                language: config.language.clone(),
            })
            .await?;
        if let Some(u) = &response.usage {
            usage.accumulate(u);
        }
        ctx.step(
            "transcribe",
            format!("Transcript ready ({} chars)", response.text.chars().count()),
        );
        Ok(json!({
            "transcript": response.text,
            "language": response.language,
            "durationSecs": response.duration_secs,
        }))
    }
}

fn analysis_prompt(prompt: &str, transcript: &str) -> String {
    format!("{}\n\nTranscript:\n{}", prompt, transcript)
}

#[async_trait]
impl NodeProcessor for MediaProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: MediaConfig = node.parse_config()?;

        let file_url = render_field(ctx, "fileUrl", &config.file_url);
        if file_url.trim().is_empty() {
            return Err(NodeError::config(format!(
                "{} node requires a fileUrl",
                self.kind
            )));
        }
        let prompt = config
            .prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| render_field(ctx, "prompt", p));

        let ai_config = load_ai_config(
            &self.services,
            config.ai_config_id.as_deref(),
            self.default_ai_config.as_deref(),
            ctx,
        )
        .await?;

        let mut usage = TokenUsage::default();
        let mut data = json!({ "fileUrl": file_url });

        match self.kind {
            NodeType::Image => {
                let prompt = prompt.unwrap_or_else(|| DEFAULT_IMAGE_PROMPT.to_string());
                ctx.step("vision", format!("Analysing image with {}", ai_config.model));
                let message = ChatMessage {
                    role: ChatRole::User,
                    content: ChatContent::Parts(vec![
                        ContentPart::Text { text: prompt },
                        ContentPart::ImageUrl { url: file_url },
                    ]),
                    tool_calls: vec![],
                    tool_call_id: None,
                };
                let (text, u) = self.chat(ai_config, message).await?;
                usage.accumulate(&u);
                data["text"] = json!(text);
            }
            NodeType::Audio => {
                let transcript = self
                    .transcribe(ai_config.clone(), &file_url, &config, ctx, &mut usage)
                    .await?;
                let text = transcript["transcript"].as_str().unwrap_or_default().to_string();
                let output = match prompt {
                    Some(prompt) => {
                        ctx.step("analyse", "Post-processing transcript");
                        let (analysis, u) = self
                            .chat(ai_config, ChatMessage::user(analysis_prompt(&prompt, &text)))
                            .await?;
                        usage.accumulate(&u);
                        analysis
                    }
                    None => text,
                };
                merge(&mut data, transcript);
                data["text"] = json!(output);
            }
            NodeType::Video => {
                let transcript = self
                    .transcribe(ai_config.clone(), &file_url, &config, ctx, &mut usage)
                    .await?;
                let text = transcript["transcript"].as_str().unwrap_or_default().to_string();
                let prompt = prompt.unwrap_or_else(|| DEFAULT_VIDEO_PROMPT.to_string());
                ctx.step("analyse", "Analysing video transcript");
                let (analysis, u) = self
                    .chat(ai_config, ChatMessage::user(analysis_prompt(&prompt, &text)))
                    .await?;
                usage.accumulate(&u);
                merge(&mut data, transcript);
                data["text"] = json!(analysis);
            }
            other => {
                return Err(NodeError::ExecutionError(format!(
                    "media processor cannot handle {} nodes",
                    other
                )))
            }
        }

        ctx.success(format!("{} node finished", self.kind));
        Ok(NodeOutput::success(node, data, started_at, ctx.now()).with_token_usage(Some(usage)))
    }
}

fn merge(target: &mut serde_json::Value, source: serde_json::Value) {
    if let (Some(target), serde_json::Value::Object(source)) = (target.as_object_mut(), source) {
        target.extend(source);
    }
}
