//! `{{name.path}}` reference resolution and text substitution.

pub mod variable_resolver;

pub use variable_resolver::{
    extract_references, render_value, resolve, resolve_operand, substitute,
    unresolved_references,
};
