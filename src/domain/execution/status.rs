//! Node execution status, the outcome of running one node.

use serde::{Deserialize, Serialize};

/// Outcome of one node execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Success,
    Error,
    Skipped,
    /// Suspended awaiting a human decision; see `approval_request_id`.
    Paused,
}

impl NodeStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, NodeStatus::Success)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
            NodeStatus::Skipped => "skipped",
            NodeStatus::Paused => "paused",
        };
        f.write_str(s)
    }
}
