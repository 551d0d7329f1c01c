//! Plain data shared by every layer of the engine.
//!
//! - [`execution`]: node outcomes (`NodeOutput`, `NodeStatus`, token usage).
//! - [`model`]: nodes, their type tags, typed configurations and conditions.

pub mod execution;
pub mod model;
