use crate::domain::model::CodeLanguage;

/// Sandbox errors
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Unsupported language: {0:?}")]
    UnsupportedLanguage(CodeLanguage),

    #[error("SyntaxError: {0}")]
    CompilationError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    #[error("TypeError: {0}")]
    TypeError(String),

    #[error("Memory limit exceeded")]
    MemoryLimitExceeded,

    #[error("Code execution timed out")]
    ExecutionTimeout,

    #[error("Sandbox unavailable: {0}")]
    SandboxUnavailable(String),
}
