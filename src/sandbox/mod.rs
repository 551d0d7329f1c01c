//! Code sandbox collaborator used by CODE nodes.

pub mod error;
pub mod types;

pub use error::SandboxError;
pub use types::{CodeSandbox, SandboxRequest, SandboxResult, DEFAULT_CODE_TIMEOUT};
