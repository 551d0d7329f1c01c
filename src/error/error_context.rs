use serde::{Deserialize, Serialize};

/// Error retryability marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorRetryability {
    Retryable,
    NonRetryable,
    Unknown,
}

/// Error severity marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Warning,
    Error,
    Fatal,
}

/// Error classification code.
///
/// Serialized in `SCREAMING_SNAKE_CASE` (`RATE_LIMIT`, `INVALID_API_KEY`, ...)
/// because these codes are shown to users next to the friendly message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Engine
    ConfigError,
    Timeout,
    SerializationError,
    InternalError,

    // AI provider
    InvalidApiKey,
    RateLimit,
    QuotaExceeded,
    ContextLengthExceeded,
    AiTimeout,

    // Code execution
    CodeReferenceError,
    CodeTypeError,
    CodeSyntaxError,
    CodeTimeout,
    CodeExecutionError,

    // Network
    NetworkError,

    // Persistence
    DuplicateRecord,
    RelationViolation,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::InvalidApiKey => "INVALID_API_KEY",
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::ContextLengthExceeded => "CONTEXT_LENGTH_EXCEEDED",
            ErrorCode::AiTimeout => "AI_TIMEOUT",
            ErrorCode::CodeReferenceError => "CODE_REFERENCE_ERROR",
            ErrorCode::CodeTypeError => "CODE_TYPE_ERROR",
            ErrorCode::CodeSyntaxError => "CODE_SYNTAX_ERROR",
            ErrorCode::CodeTimeout => "CODE_TIMEOUT",
            ErrorCode::CodeExecutionError => "CODE_EXECUTION_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::DuplicateRecord => "DUPLICATE_RECORD",
            ErrorCode::RelationViolation => "RELATION_VIOLATION",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub retryability: ErrorRetryability,
    pub severity: ErrorSeverity,
    pub message: String,
}

impl ErrorContext {
    pub fn retryable(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            retryability: ErrorRetryability::Retryable,
            severity: ErrorSeverity::Error,
            message: message.into(),
        }
    }

    /// Fatal configuration problem; aborts the node and is never retried.
    pub fn fatal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            retryability: ErrorRetryability::NonRetryable,
            severity: ErrorSeverity::Fatal,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryability == ErrorRetryability::Retryable
    }
}
