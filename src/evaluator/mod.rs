//! Condition evaluation for branching and iteration nodes.

pub mod condition;
pub mod type_coercion;

pub use condition::{combine, evaluate, evaluate_all, evaluate_each};
