use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::config::{
    ApprovalConfig, CodeConfig, ConditionConfig, DataConfig, InputConfig, LoopConfig,
    MediaConfig, OutputConfig, ProcessConfig,
};
use crate::error::{NodeError, NodeResult};

/// The closed set of node type tags.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Input,
    Process,
    Code,
    Output,
    Condition,
    Loop,
    Data,
    Image,
    Video,
    Audio,
    Approval,
}

impl NodeType {
    pub const ALL: [NodeType; 11] = [
        NodeType::Input,
        NodeType::Process,
        NodeType::Code,
        NodeType::Output,
        NodeType::Condition,
        NodeType::Loop,
        NodeType::Data,
        NodeType::Image,
        NodeType::Video,
        NodeType::Audio,
        NodeType::Approval,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Input => "INPUT",
            NodeType::Process => "PROCESS",
            NodeType::Code => "CODE",
            NodeType::Output => "OUTPUT",
            NodeType::Condition => "CONDITION",
            NodeType::Loop => "LOOP",
            NodeType::Data => "DATA",
            NodeType::Image => "IMAGE",
            NodeType::Video => "VIDEO",
            NodeType::Audio => "AUDIO",
            NodeType::Approval => "APPROVAL",
        }
    }

    /// Node types whose work is delegated to the AI service.
    pub fn uses_ai(&self) -> bool {
        matches!(
            self,
            NodeType::Process | NodeType::Image | NodeType::Video | NodeType::Audio
        )
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed unit of work in a workflow graph.
///
/// `name` is what `{{name.path}}` references resolve against; `id` is the
/// stable graph identifier.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub config: Value,
}

/// A node configuration parsed into the shape its type requires.
#[derive(Debug, Clone)]
pub enum NodeConfig {
    Input(InputConfig),
    Process(ProcessConfig),
    Code(CodeConfig),
    Output(OutputConfig),
    Condition(ConditionConfig),
    Loop(LoopConfig),
    Data(DataConfig),
    Image(MediaConfig),
    Video(MediaConfig),
    Audio(MediaConfig),
    Approval(ApprovalConfig),
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        node_type: NodeType,
        name: impl Into<String>,
        config: Value,
    ) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            config,
        }
    }

    /// Deserialize `config` into a concrete configuration struct.
    pub fn parse_config<T: serde::de::DeserializeOwned>(&self) -> NodeResult<T> {
        let config = if self.config.is_null() {
            Value::Object(Default::default())
        } else {
            self.config.clone()
        };
        serde_json::from_value(config).map_err(|e| {
            NodeError::ConfigError(format!(
                "invalid {} config for node '{}': {}",
                self.node_type, self.name, e
            ))
        })
    }

    pub fn typed_config(&self) -> NodeResult<NodeConfig> {
        Ok(match self.node_type {
            NodeType::Input => NodeConfig::Input(self.parse_config()?),
            NodeType::Process => NodeConfig::Process(self.parse_config()?),
            NodeType::Code => NodeConfig::Code(self.parse_config()?),
            NodeType::Output => NodeConfig::Output(self.parse_config()?),
            NodeType::Condition => NodeConfig::Condition(self.parse_config()?),
            NodeType::Loop => NodeConfig::Loop(self.parse_config()?),
            NodeType::Data => NodeConfig::Data(self.parse_config()?),
            NodeType::Image => NodeConfig::Image(self.parse_config()?),
            NodeType::Video => NodeConfig::Video(self.parse_config()?),
            NodeType::Audio => NodeConfig::Audio(self.parse_config()?),
            NodeType::Approval => NodeConfig::Approval(self.parse_config()?),
        })
    }
}
