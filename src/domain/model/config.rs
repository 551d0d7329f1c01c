//! Typed per-node configurations.
//!
//! Every struct deserializes from the camelCase JSON stored on a [`Node`].
//! Free-form text fields (prompts, code, templates, file names) may contain
//! `{{name.path}}` references that processors substitute at run time.
//!
//! [`Node`]: super::Node

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::condition::{Condition, ConditionMode};

// ================================
// INPUT
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    #[serde(default)]
    pub fields: Vec<InputField>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
}

// ================================
// PROCESS
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcessConfig {
    #[serde(default)]
    pub ai_config_id: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default, alias = "prompt")]
    pub user_prompt: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub enable_tool_calling: Option<bool>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

impl ProcessConfig {
    /// Tool-calling is on when explicitly enabled or when any tool is enabled.
    pub fn wants_tools(&self) -> bool {
        self.enable_tool_calling == Some(true) || self.tools.iter().any(|t| t.enabled)
    }

    pub fn enabled_tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter().filter(|t| t.enabled)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

// ================================
// CODE
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CodeLanguage {
    #[default]
    #[serde(alias = "js")]
    Javascript,
    #[serde(alias = "ts")]
    Typescript,
    #[serde(alias = "py")]
    Python,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CodeConfig {
    pub code: String,
    #[serde(default)]
    pub language: CodeLanguage,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

// ================================
// OUTPUT
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Json,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    #[serde(default, alias = "content")]
    pub template: String,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub file_name: Option<String>,
}

// ================================
// CONDITION
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConditionConfig {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub mode: ConditionMode,
}

// ================================
// LOOP
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoopType {
    For,
    While,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ForLoopConfig {
    /// `{{name.path}}` reference that must resolve to an array.
    pub array_variable: String,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub index_name: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WhileLoopConfig {
    pub condition: Condition,
    /// Hard ceiling independent of the condition.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    pub loop_type: LoopType,
    #[serde(default)]
    pub for_config: Option<ForLoopConfig>,
    #[serde(default)]
    pub while_config: Option<WhileLoopConfig>,
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

// ================================
// DATA
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct DataConfig {
    #[serde(default)]
    pub data: Option<Value>,
    /// Name of an imported file to expose as this node's data.
    #[serde(default)]
    pub file_name: Option<String>,
}

// ================================
// IMAGE / VIDEO / AUDIO
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    #[serde(default, alias = "source", alias = "url")]
    pub file_url: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub ai_config_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

// ================================
// APPROVAL
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub approvers: Vec<String>,
    #[serde(default)]
    pub timeout_hours: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wants_tools_explicit_flag() {
        let cfg: ProcessConfig =
            serde_json::from_value(json!({"userPrompt": "x", "enableToolCalling": true})).unwrap();
        assert!(cfg.wants_tools());
    }

    #[test]
    fn test_wants_tools_enabled_tool() {
        let cfg: ProcessConfig = serde_json::from_value(json!({
            "userPrompt": "x",
            "tools": [{"name": "search"}]
        }))
        .unwrap();
        assert!(cfg.wants_tools());
    }

    #[test]
    fn test_wants_tools_all_disabled() {
        let cfg: ProcessConfig = serde_json::from_value(json!({
            "userPrompt": "x",
            "enableToolCalling": false,
            "tools": [{"name": "search", "enabled": false}]
        }))
        .unwrap();
        assert!(!cfg.wants_tools());
    }

    #[test]
    fn test_loop_config_parse() {
        let cfg: LoopConfig = serde_json::from_value(json!({
            "loopType": "FOR",
            "forConfig": {"arrayVariable": "{{list.items}}", "itemName": "row"},
            "maxIterations": 10
        }))
        .unwrap();
        assert_eq!(cfg.loop_type, LoopType::For);
        assert_eq!(cfg.for_config.unwrap().item_name.as_deref(), Some("row"));
    }
}
