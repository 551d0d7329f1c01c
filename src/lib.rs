//! # nodeflow: a node execution engine
//!
//! `nodeflow` runs the typed steps of a workflow graph one node at a time
//! against a shared [`ExecutionContext`]. It provides:
//!
//! - **Dispatch**: a [`ProcessorRegistry`] mapping each [`NodeType`] to a
//!   [`NodeProcessor`], with PROCESS nodes that enable tools routed to a
//!   tool-calling processor.
//! - **Variable references**: `{{name.path}}` lookup and substitution over
//!   earlier node outputs and global variables.
//! - **Control flow**: condition evaluation and an immutable FOR/WHILE
//!   [`LoopState`] machine.
//! - **Debugging**: [`DebugRunner`] runs a single node with mocked upstream
//!   outputs under a timeout and always returns the log trail.
//! - **Error classification**: [`analyze_error`] turns raw failures into a
//!   small user-facing taxonomy.
//!
//! AI providers, code sandboxes, tool execution and approval storage are
//! collaborators behind traits; plug them in through [`EngineServices`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nodeflow::{DebugRequest, DebugRunner, EngineConfig, Node, NodeType, ProcessorRegistry};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = EngineConfig::from_env();
//!     let registry = Arc::new(ProcessorRegistry::new(Default::default(), &config));
//!     let node = Node::new(
//!         "c1",
//!         NodeType::Condition,
//!         "Check",
//!         json!({"conditions": [{"variable": "{{Score.value}}", "operator": "greaterThan", "value": 50}]}),
//!     );
//!     let result = DebugRunner::new(registry, config)
//!         .debug_node(DebugRequest::new(node).with_mock_output("Score", json!({"value": 72})))
//!         .await;
//!     println!("{:?} {}", result.status, result.output);
//! }
//! ```

pub mod approval;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod nodes;
pub mod sandbox;
pub mod template;

pub use crate::approval::{
    ApprovalError, ApprovalRequest, ApprovalStatus, ApprovalStore, InMemoryApprovalStore,
};
pub use crate::config::EngineConfig;
pub use crate::core::{
    DebugRequest, DebugResult, DebugRunner, ExecutionContext, FakeIdGenerator, FakeTimeProvider,
    IdGenerator, ImportedFile, KeyRedactor, LogEntry, LogLevel, LogSink, Redactor,
    RealIdGenerator, RealTimeProvider, RuntimeContext, TimeProvider,
};
pub use crate::domain::execution::{NodeOutput, NodeStatus, TokenUsage};
pub use crate::domain::model::{Condition, ConditionMode, ConditionOperator, Node, NodeType};
pub use crate::error::{
    analyze_error, analyze_node_error, ErrorAnalysis, ErrorCode, NodeError, NodeResult,
};
pub use crate::evaluator::{evaluate, evaluate_all};
pub use crate::llm::{AiConfig, AiConfigStore, AiService, AiServiceError, ToolExecutor};
pub use crate::nodes::flow::{LoopState, DEFAULT_MAX_ITERATIONS};
pub use crate::nodes::{EngineServices, NodeProcessor, ProcessorRegistry};
pub use crate::sandbox::{CodeSandbox, SandboxError, SandboxRequest, SandboxResult};
pub use crate::template::{resolve, substitute};
