use std::error::Error as StdError;

use thiserror::Error;

use super::error_context::{ErrorCode, ErrorContext};

/// Node-level errors
#[derive(Debug, Error)]
pub enum NodeError {
    /// Missing or malformed required configuration. Never retried.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("No processor registered for node type: {0}")]
    ExecutorNotFound(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Node execution timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("AI service error: {0}")]
    Ai(#[from] crate::llm::AiServiceError),
    #[error("Sandbox error: {0}")]
    Sandbox(#[from] crate::sandbox::SandboxError),
    #[error("Approval error: {0}")]
    Approval(#[from] crate::approval::ApprovalError),
    #[error("{error}")]
    WithContext {
        #[source]
        error: Box<NodeError>,
        context: ErrorContext,
    },
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}

impl NodeError {
    pub fn config(message: impl Into<String>) -> Self {
        NodeError::ConfigError(message.into())
    }

    pub fn with_context(self, context: ErrorContext) -> Self {
        NodeError::WithContext {
            error: Box::new(self),
            context,
        }
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            NodeError::WithContext { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn inner(&self) -> &NodeError {
        match self {
            NodeError::WithContext { error, .. } => error.inner(),
            other => other,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.inner(), NodeError::ConfigError(_))
    }

    pub fn is_retryable(&self) -> bool {
        if let Some(ctx) = self.context() {
            return ctx.is_retryable();
        }
        match self.inner() {
            NodeError::Timeout(_) => true,
            NodeError::Ai(e) => e.is_retryable(),
            _ => false,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        if let Some(ctx) = self.context() {
            return ctx.code;
        }
        match self.inner() {
            NodeError::ConfigError(_) | NodeError::ExecutorNotFound(_) => ErrorCode::ConfigError,
            NodeError::Timeout(_) => ErrorCode::Timeout,
            NodeError::SerializationError(_) => ErrorCode::SerializationError,
            NodeError::Sandbox(_) => ErrorCode::CodeExecutionError,
            _ => ErrorCode::InternalError,
        }
    }

    /// The display message followed by up to `max_lines - 1` lines of the
    /// `source()` chain. Used wherever the core records a failure.
    pub fn trace_lines(&self, max_lines: usize) -> Vec<String> {
        let mut lines = vec![self.to_string()];
        let mut source = self.source();
        while let Some(err) = source {
            if lines.len() >= max_lines {
                break;
            }
            let line = format!("caused by: {}", err);
            if !lines.iter().any(|l| l.ends_with(&err.to_string())) {
                lines.push(line);
            }
            source = err.source();
        }
        lines.truncate(max_lines.max(1));
        lines
    }
}
