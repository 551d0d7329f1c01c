//! AI service collaborators.
//!
//! The engine never talks to a provider directly. Processors go through
//! [`AiService`] (chat and transcription), resolve stored configurations
//! through [`AiConfigStore`], and run tool calls through [`ToolExecutor`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

pub mod error;
pub mod executor;
pub mod media;
#[cfg(test)]
pub(crate) mod mock;
pub mod types;

pub use error::AiServiceError;
pub use executor::ProcessNodeProcessor;
pub use media::MediaProcessor;
pub use types::{
    AiConfig, ChatContent, ChatMessage, ChatRequest, ChatResponse, ChatRole, ContentPart,
    ToolCall, ToolDefinition, TranscriptionRequest, TranscriptionResponse,
};

/// Provider-agnostic AI client.
#[async_trait]
pub trait AiService: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AiServiceError>;

    async fn transcribe(
        &self,
        request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, AiServiceError>;
}

/// Lookup of stored AI configurations by id.
#[async_trait]
pub trait AiConfigStore: Send + Sync {
    async fn load(&self, config_id: &str) -> Result<AiConfig, AiServiceError>;
}

/// Executes a tool requested by the model and returns its textual result.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<String, AiServiceError>;
}

/// Fixed set of configurations, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAiConfigStore {
    configs: HashMap<String, AiConfig>,
}

impl InMemoryAiConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AiConfig) -> Self {
        self.configs.insert(config.id.clone(), config);
        self
    }
}

#[async_trait]
impl AiConfigStore for InMemoryAiConfigStore {
    async fn load(&self, config_id: &str) -> Result<AiConfig, AiServiceError> {
        self.configs
            .get(config_id)
            .cloned()
            .ok_or_else(|| AiServiceError::ConfigNotFound(config_id.to_string()))
    }
}
