use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{DataConfig, Node};
use crate::error::{NodeError, NodeResult};
use crate::nodes::executor::NodeProcessor;
use crate::nodes::utils::describe;
use crate::template::resolve_operand;

/// Data node processor
///
/// Emits static data, or the content of an imported file when `fileName`
/// is set. String leaves of static data may reference earlier nodes.
pub struct DataProcessor;

fn resolve_leaves(value: &Value, ctx: &ExecutionContext) -> Value {
    match value {
        Value::String(_) => resolve_operand(value, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_leaves(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_leaves(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[async_trait]
impl NodeProcessor for DataProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: DataConfig = node.parse_config()?;

        let data = if let Some(file_name) = config.file_name.as_deref().filter(|f| !f.is_empty()) {
            let file = ctx
                .imported_file(file_name)
                .ok_or_else(|| NodeError::config(format!("Imported file '{}' not found", file_name)))?;
            let data = if file.content.is_null() {
                json!({
                    "name": file.name,
                    "mimeType": file.mime_type,
                    "url": file.url,
                })
            } else {
                file.content.clone()
            };
            ctx.step("data", format!("Loaded imported file {}", file_name));
            data
        } else {
            match &config.data {
                Some(raw) => resolve_leaves(raw, ctx),
                None => {
                    ctx.warning("Data node has no data configured");
                    Value::Null
                }
            }
        };

        ctx.step("data", format!("Produced {}", describe(&data)));
        Ok(NodeOutput::success(node, data, started_at, ctx.now()))
    }
}
