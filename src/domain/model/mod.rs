//! Node definitions and their typed configurations.

mod condition;
mod config;
mod node;

pub use condition::{Condition, ConditionMode, ConditionOperator};
pub use config::{
    ApprovalConfig, CodeConfig, CodeLanguage, ConditionConfig, DataConfig, ForLoopConfig,
    InputConfig, InputField, LoopConfig, LoopType, MediaConfig, OutputConfig, OutputFormat,
    ProcessConfig, ToolSpec, WhileLoopConfig,
};
pub use node::{Node, NodeConfig, NodeType};
