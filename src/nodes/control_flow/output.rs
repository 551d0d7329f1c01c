use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{Node, OutputConfig, OutputFormat};
use crate::error::{NodeError, NodeResult};
use crate::nodes::executor::NodeProcessor;
use crate::nodes::utils::render_field;

/// Output node processor
///
/// Renders the template in the declared format. JSON output must parse;
/// the parsed value is returned alongside the text.
pub struct OutputProcessor;

#[async_trait]
impl NodeProcessor for OutputProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: OutputConfig = node.parse_config()?;

        let content = render_field(ctx, "template", &config.template);
        let file_name = match config.file_name.as_deref() {
            Some(template) if !template.trim().is_empty() => {
                render_field(ctx, "fileName", template)
            }
            _ => format!("{}.{}", node.name, config.format.extension()),
        };

        let mut data = json!({
            "content": content,
            "format": config.format,
            "fileName": file_name,
        });

        if config.format == OutputFormat::Json {
            let parsed: Value = serde_json::from_str(&content).map_err(|e| {
                NodeError::ExecutionError(format!("Output is not valid JSON: {}", e))
            })?;
            data["json"] = parsed;
        }

        ctx.step(
            "output",
            format!("Rendered {} output ({} chars)", config.format.extension(), content.len()),
        );
        Ok(NodeOutput::success(node, data, started_at, ctx.now()))
    }
}
