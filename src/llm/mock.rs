//! Scripted AI service for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    AiConfig, AiService, AiServiceError, ChatRequest, ChatResponse,
    InMemoryAiConfigStore, TranscriptionRequest, TranscriptionResponse,
};
use crate::domain::execution::TokenUsage;

pub(crate) struct MockAiService {
    replies: Mutex<VecDeque<Result<ChatResponse, AiServiceError>>>,
    pub(crate) requests: Mutex<Vec<ChatRequest>>,
    transcript: String,
}

impl MockAiService {
    pub(crate) fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            transcript: "hello from the recording".into(),
        }
    }

    pub(crate) fn reply(self, reply: Result<ChatResponse, AiServiceError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn text(self, content: &str) -> Self {
        self.reply(Ok(text_response(content)))
    }

    pub(crate) fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

pub(crate) fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        content: content.into(),
        usage: TokenUsage::new(10, 5),
        model: "mock-model".into(),
        finish_reason: Some("stop".into()),
        tool_calls: vec![],
    }
}

pub(crate) fn config_store() -> InMemoryAiConfigStore {
    InMemoryAiConfigStore::new().with_config(AiConfig {
        id: "default".into(),
        provider: "mock".into(),
        model: "mock-model".into(),
        temperature: Some(0.2),
        max_tokens: None,
        api_key: Some("sk-test".into()),
        base_url: None,
    })
}

#[async_trait]
impl AiService for MockAiService {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AiServiceError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(text_response("default reply")))
    }

    async fn transcribe(
        &self,
        _request: TranscriptionRequest,
    ) -> Result<TranscriptionResponse, AiServiceError> {
        Ok(TranscriptionResponse {
            text: self.transcript.clone(),
            language: Some("en".into()),
            duration_secs: Some(12.5),
            usage: Some(TokenUsage::new(3, 0)),
        })
    }
}

