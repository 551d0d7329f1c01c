//! Engine-wide tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::nodes::flow::loop_controller::DEFAULT_MAX_ITERATIONS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default DebugRunner timeout, overridable per request.
    pub debug_timeout_secs: u64,
    /// Global loop ceiling.
    pub max_loop_iterations: usize,
    /// Upper bound on model/tool round trips for tool-aware PROCESS nodes.
    pub max_tool_rounds: usize,
    /// Error-chain lines recorded when a node fails.
    pub error_trace_lines: usize,
    /// AI config used when a node names none.
    pub default_ai_config_id: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug_timeout_secs: 240,
            max_loop_iterations: DEFAULT_MAX_ITERATIONS,
            max_tool_rounds: 5,
            error_trace_lines: 5,
            default_ai_config_id: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `NODEFLOW_*` environment variables. Unparseable
    /// values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse("NODEFLOW_DEBUG_TIMEOUT_SECS") {
            config.debug_timeout_secs = v;
        }
        if let Some(v) = env_parse("NODEFLOW_MAX_LOOP_ITERATIONS") {
            config.max_loop_iterations = v;
        }
        if let Some(v) = env_parse("NODEFLOW_MAX_TOOL_ROUNDS") {
            config.max_tool_rounds = v;
        }
        if let Ok(id) = std::env::var("NODEFLOW_DEFAULT_AI_CONFIG_ID") {
            if !id.is_empty() {
                config.default_ai_config_id = Some(id);
            }
        }
        config
    }

    pub fn debug_timeout(&self) -> Duration {
        Duration::from_secs(self.debug_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
