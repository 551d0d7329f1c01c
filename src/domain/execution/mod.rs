//! Execution status and output models.

mod output;
mod status;

pub use output::{NodeOutput, TokenUsage};
pub use status::NodeStatus;
