pub mod agent;
pub mod control_flow;
pub mod data_transform;
pub mod executor;
pub mod flow;
pub mod human_input;
pub mod utils;

pub use agent::ToolProcessProcessor;
pub use executor::*;
pub use human_input::ApprovalProcessor;
