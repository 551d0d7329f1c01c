use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::NodeStatus;
use crate::domain::model::{Node, NodeType};

/// Token accounting reported by the AI service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// The result record produced by executing one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub node_id: String,
    pub node_name: String,
    pub node_type: NodeType,
    pub status: NodeStatus,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Milliseconds between `started_at` and `completed_at`.
    pub duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_request_id: Option<String>,
}

impl NodeOutput {
    fn base(
        node: &Node,
        status: NodeStatus,
        data: Value,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let completed_at = completed_at.max(started_at);
        Self {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            node_type: node.node_type,
            status,
            data,
            error: None,
            started_at,
            completed_at,
            duration: (completed_at - started_at).num_milliseconds(),
            token_usage: None,
            approval_request_id: None,
        }
    }

    pub fn success(
        node: &Node,
        data: Value,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self::base(node, NodeStatus::Success, data, started_at, completed_at)
    }

    pub fn failure(
        node: &Node,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let mut output = Self::base(node, NodeStatus::Error, Value::Null, started_at, completed_at);
        output.error = Some(error.into());
        output
    }

    pub fn paused(
        node: &Node,
        approval_request_id: impl Into<String>,
        data: Value,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let mut output = Self::base(node, NodeStatus::Paused, data, started_at, completed_at);
        output.approval_request_id = Some(approval_request_id.into());
        output
    }

    /// An upstream output injected without running its node, as the debug
    /// runner does for mock inputs.
    pub fn seeded(
        node_name: impl Into<String>,
        node_type: NodeType,
        data: Value,
        at: DateTime<Utc>,
    ) -> Self {
        let node_name = node_name.into();
        Self {
            node_id: format!("mock-{}", node_name),
            node_name,
            node_type,
            status: NodeStatus::Success,
            data,
            error: None,
            started_at: at,
            completed_at: at,
            duration: 0,
            token_usage: None,
            approval_request_id: None,
        }
    }

    pub fn with_token_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.token_usage = usage;
        self
    }
}
