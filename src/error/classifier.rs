//! Heuristic classification of raw failures into user-facing hints.
//!
//! The classifier is advisory: its output is displayed next to a failed node
//! and is never consulted by retry logic. Rules are checked in a fixed order
//! and the first match wins: AI provider, code execution, network,
//! persistence, then a generic fallback.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error_context::ErrorCode;
use super::node_error::NodeError;
use crate::domain::model::NodeType;

/// Result of classifying a raw error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    /// The raw error text, unchanged.
    pub message: String,
    pub friendly_message: String,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub is_retryable: bool,
}

impl ErrorAnalysis {
    fn new(
        raw: &str,
        code: Option<ErrorCode>,
        friendly: &str,
        suggestions: &[&str],
        is_retryable: bool,
    ) -> Self {
        Self {
            message: raw.to_string(),
            friendly_message: friendly.to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            code,
            is_retryable,
        }
    }
}

/// Classify a raw error message. `node_type_hint` steers ambiguous cases,
/// e.g. a timeout inside a CODE node is a script timeout, not a provider one.
pub fn analyze_error(raw: &str, node_type_hint: Option<NodeType>) -> ErrorAnalysis {
    let lower = raw.to_lowercase();
    let is_code_node = node_type_hint == Some(NodeType::Code);

    if let Some(analysis) = classify_ai(raw, &lower, is_code_node) {
        return analysis;
    }
    if let Some(analysis) = classify_code(raw, &lower, is_code_node) {
        return analysis;
    }
    if let Some(analysis) = classify_network(raw, &lower) {
        return analysis;
    }
    if let Some(analysis) = classify_persistence(raw, &lower) {
        return analysis;
    }

    ErrorAnalysis::new(
        raw,
        None,
        "The node failed with an unexpected error.",
        &[
            "Check the node configuration and its upstream inputs",
            "Run the node in debug mode to inspect the log trail",
        ],
        false,
    )
}

/// Classify a [`NodeError`]. Errors that already carry a structured timeout
/// or configuration meaning are mapped directly; everything else goes
/// through the text heuristics.
pub fn analyze_node_error(err: &NodeError, node_type_hint: Option<NodeType>) -> ErrorAnalysis {
    let raw = err.to_string();
    match err.inner() {
        NodeError::ConfigError(_) | NodeError::ExecutorNotFound(_) => ErrorAnalysis::new(
            &raw,
            Some(ErrorCode::ConfigError),
            "The node is not configured correctly.",
            &[
                "Open the node settings and fill in the required fields",
                "Check that referenced variables point to list values where a list is expected",
            ],
            false,
        ),
        NodeError::Timeout(_)
            if !node_type_hint.is_some_and(|t| t.uses_ai() || t == NodeType::Code) =>
        {
            ErrorAnalysis::new(
                &raw,
                Some(ErrorCode::Timeout),
                "The node did not finish within the allowed time.",
                &[
                    "Run the node again",
                    "Raise the debug timeout if the node legitimately needs longer",
                ],
                true,
            )
        }
        _ => analyze_error(&raw, node_type_hint),
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn status_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}\b").expect("status code pattern is a valid regex"))
}

/// Whether `code` appears as a standalone number, so `4012` or `1429` in a
/// position or line number does not count as an HTTP status.
fn has_status_code(haystack: &str, code: &str) -> bool {
    status_code_regex()
        .find_iter(haystack)
        .any(|m| m.as_str() == code)
}

fn classify_ai(raw: &str, lower: &str, is_code_node: bool) -> Option<ErrorAnalysis> {
    if contains_any(
        lower,
        &[
            "api key",
            "api_key",
            "apikey",
            "invalid_api_key",
            "unauthorized",
            "authentication",
        ],
    ) || has_status_code(lower, "401")
    {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::InvalidApiKey),
            "The AI provider rejected the credentials.",
            &[
                "Verify the API key in the AI configuration",
                "Make sure the key has not been revoked or expired",
            ],
            false,
        ));
    }
    if contains_any(lower, &["rate limit", "rate_limit", "ratelimit", "too many requests"])
        || has_status_code(lower, "429")
    {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::RateLimit),
            "The AI provider is rate limiting requests.",
            &[
                "Wait a moment and run the node again",
                "Reduce the number of parallel executions",
            ],
            true,
        ));
    }
    if contains_any(lower, &["quota", "insufficient_quota", "billing", "credit balance"]) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::QuotaExceeded),
            "The AI provider account has run out of quota.",
            &[
                "Check the billing status of the provider account",
                "Switch the node to a different AI configuration",
            ],
            false,
        ));
    }
    if contains_any(
        lower,
        &[
            "context length",
            "context_length",
            "maximum context",
            "context window",
            "too many tokens",
            "token limit",
        ],
    ) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::ContextLengthExceeded),
            "The prompt is too long for the selected model.",
            &[
                "Shorten the prompt or the referenced upstream outputs",
                "Choose a model with a larger context window",
            ],
            false,
        ));
    }
    if !is_code_node && contains_any(lower, &["timeout", "timed out"]) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::AiTimeout),
            "The request took too long to complete.",
            &[
                "Run the node again",
                "Simplify the prompt or lower the requested output length",
            ],
            true,
        ));
    }
    None
}

fn classify_code(raw: &str, lower: &str, is_code_node: bool) -> Option<ErrorAnalysis> {
    if raw.contains("ReferenceError") || lower.contains("is not defined") {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::CodeReferenceError),
            "The script uses a variable that does not exist.",
            &[
                "Check variable names for typos",
                "Make sure upstream values are referenced with {{name.path}}",
            ],
            false,
        ));
    }
    if raw.contains("TypeError") || lower.contains("is not a function") {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::CodeTypeError),
            "The script used a value of the wrong type.",
            &[
                "Check for null or missing values before accessing properties",
                "Inspect the upstream output shape in debug mode",
            ],
            false,
        ));
    }
    if raw.contains("SyntaxError") || lower.contains("unexpected token") {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::CodeSyntaxError),
            "The script contains a syntax error.",
            &["Check brackets, quotes and semicolons near the reported position"],
            false,
        ));
    }
    if !is_code_node {
        return None;
    }
    if contains_any(lower, &["timeout", "timed out"]) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::CodeTimeout),
            "The script ran for too long.",
            &[
                "Look for infinite loops",
                "Reduce the amount of data processed in one run",
            ],
            true,
        ));
    }
    Some(ErrorAnalysis::new(
        raw,
        Some(ErrorCode::CodeExecutionError),
        "The script failed while running.",
        &["Run the node in debug mode and inspect the script output"],
        false,
    ))
}

fn classify_network(raw: &str, lower: &str) -> Option<ErrorAnalysis> {
    if contains_any(
        lower,
        &[
            "econnrefused",
            "econnreset",
            "enotfound",
            "etimedout",
            "connection refused",
            "connection reset",
            "getaddrinfo",
            "dns",
            "network",
            "socket hang up",
            "fetch failed",
        ],
    ) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::NetworkError),
            "A network connection failed.",
            &[
                "Check your internet connection",
                "Retry in a few moments; the remote service may be briefly unavailable",
            ],
            true,
        ));
    }
    None
}

fn classify_persistence(raw: &str, lower: &str) -> Option<ErrorAnalysis> {
    if contains_any(
        lower,
        &["unique constraint", "duplicate key", "already exists", "p2002"],
    ) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::DuplicateRecord),
            "A record with the same unique value already exists.",
            &["Use a different name or identifier"],
            false,
        ));
    }
    if contains_any(
        lower,
        &["foreign key", "relation", "p2003", "p2025", "record to update not found"],
    ) {
        return Some(ErrorAnalysis::new(
            raw,
            Some(ErrorCode::RelationViolation),
            "A referenced record is missing or still in use.",
            &["Check that the related record exists and has not been deleted"],
            false,
        ));
    }
    None
}
