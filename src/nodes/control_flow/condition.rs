use async_trait::async_trait;
use serde_json::json;

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{ConditionConfig, Node};
use crate::error::NodeResult;
use crate::evaluator::{combine, evaluate_each};
use crate::nodes::executor::NodeProcessor;

/// Condition node processor
///
/// Output data is `{result, branch, conditions}`; `branch` is `"true"` or
/// `"false"` and selects the outgoing edge.
pub struct ConditionProcessor;

#[async_trait]
impl NodeProcessor for ConditionProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: ConditionConfig = node.parse_config()?;

        if config.conditions.is_empty() {
            ctx.warning("Condition node has no conditions");
        }

        let results = evaluate_each(&config.conditions, ctx);
        let mut details = Vec::with_capacity(results.len());
        for (condition, &passed) in config.conditions.iter().zip(&results) {
            let mut detail = json!({
                "variable": condition.variable,
                "operator": condition.operator,
                "result": passed,
            });
            if condition.operator.is_unary() {
                ctx.step(
                    "condition",
                    format!("{} {:?} => {}", condition.variable, condition.operator, passed),
                );
            } else {
                ctx.step(
                    "condition",
                    format!(
                        "{} {:?} {} => {}",
                        condition.variable, condition.operator, condition.value, passed
                    ),
                );
                detail["value"] = condition.value.clone();
            }
            details.push(detail);
        }

        let result = combine(results, config.mode);
        let branch = if result { "true" } else { "false" };
        ctx.success(format!("Condition resolved to branch {}", branch));

        Ok(NodeOutput::success(
            node,
            json!({
                "result": result,
                "branch": branch,
                "conditions": details,
            }),
            started_at,
            ctx.now(),
        ))
    }
}
