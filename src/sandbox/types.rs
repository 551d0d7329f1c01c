use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::SandboxError;
use crate::domain::model::CodeLanguage;

// ================================
// CodeSandbox Trait
// ================================

/// Code sandbox execution interface
///
/// Implementations isolate user scripts (embedded interpreter, WASM, remote
/// service). The CODE processor only ever talks to this trait.
#[async_trait::async_trait]
pub trait CodeSandbox: Send + Sync {
    /// Supported language list
    fn supported_languages(&self) -> Vec<CodeLanguage> {
        vec![CodeLanguage::Javascript]
    }

    /// Execute code
    ///
    /// # Returns
    /// - `Ok(SandboxResult)`: the script completed, `output` holds its return value
    /// - `Err(SandboxError)`: the script failed or could not be run
    async fn execute(&self, request: SandboxRequest) -> Result<SandboxResult, SandboxError>;
}

// ================================
// Request / Response
// ================================

/// Sandbox execution request
#[derive(Debug, Clone)]
pub struct SandboxRequest {
    /// Code, with references already substituted
    pub code: String,

    /// Programming language
    pub language: CodeLanguage,

    /// Upstream outputs keyed by node name
    pub inputs: Value,

    /// Execution timeout
    pub timeout: Duration,
}

/// Sandbox execution result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxResult {
    /// Output data
    pub output: Value,

    /// Console lines captured during the run
    #[serde(default)]
    pub logs: Vec<String>,

    /// Execution time in milliseconds
    #[serde(default)]
    pub execution_time_ms: u64,
}

/// Default per-script timeout when a CODE node sets none.
pub const DEFAULT_CODE_TIMEOUT: Duration = Duration::from_secs(30);
