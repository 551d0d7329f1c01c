use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiServiceError {
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("Rate limit exceeded (429): retry after {retry_after:?}s")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out")]
    Timeout,

    #[error("AI config not found: {0}")]
    ConfigNotFound(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AiServiceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AiServiceError::RateLimitExceeded { .. }
            | AiServiceError::NetworkError(_)
            | AiServiceError::Timeout => true,
            AiServiceError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
