use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{InputConfig, Node};
use crate::error::{NodeError, NodeResult};
use crate::nodes::executor::NodeProcessor;

/// Input node processor
///
/// Collects the declared fields from the run's global variables, where the
/// caller places user-supplied inputs. With no declared fields every global
/// variable is passed through.
pub struct InputProcessor;

#[async_trait]
impl NodeProcessor for InputProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: InputConfig = node.parse_config()?;

        if config.fields.is_empty() {
            let data = Value::Object(ctx.global_variables().clone());
            ctx.step("input", "No fields declared; passing through runtime inputs");
            return Ok(NodeOutput::success(node, data, started_at, ctx.now()));
        }

        let mut values = Map::new();
        for field in &config.fields {
            let provided = ctx
                .global_variable(&field.name)
                .filter(|v| !v.is_null())
                .cloned();
            let value = match (provided, &field.default_value) {
                (Some(v), _) => v,
                (None, Some(default)) => {
                    ctx.step("input", format!("Using default for field {}", field.name));
                    default.clone()
                }
                (None, None) if field.required => {
                    let label = field.label.as_deref().unwrap_or(&field.name);
                    return Err(NodeError::config(format!(
                        "Required input field '{}' was not provided",
                        label
                    )));
                }
                (None, None) => Value::Null,
            };
            values.insert(field.name.clone(), value);
        }

        ctx.step_with_data("input", "Collected input fields", Value::Object(values.clone()));
        Ok(NodeOutput::success(
            node,
            Value::Object(values),
            started_at,
            ctx.now(),
        ))
    }
}
