//! Error types for the node execution engine.
//!
//! - [`NodeError`]: errors raised while dispatching or running a node.
//! - [`ErrorContext`]: code, retryability and severity attached to an error.
//! - [`analyze_error`]: heuristic, user-facing classification of raw failures.

pub mod classifier;
pub mod error_context;
pub mod node_error;

pub use classifier::{analyze_error, analyze_node_error, ErrorAnalysis};
pub use error_context::{ErrorCode, ErrorContext, ErrorRetryability, ErrorSeverity};
pub use node_error::NodeError;

/// Convenience alias for node-level results.
pub type NodeResult<T> = Result<T, NodeError>;
