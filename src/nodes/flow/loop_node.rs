//! Loop node processor.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{LoopConfig, Node};
use crate::error::NodeResult;
use crate::nodes::executor::NodeProcessor;

use super::loop_controller::{get_loop_context_variables, initialize_loop, DEFAULT_MAX_ITERATIONS};

pub struct LoopProcessor {
    max_iterations: usize,
}

impl Default for LoopProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl LoopProcessor {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }
}

#[async_trait]
impl NodeProcessor for LoopProcessor {
    async fn process(&self, node: &Node, ctx: &mut ExecutionContext) -> NodeResult<NodeOutput> {
        let started_at = ctx.now();
        let config: LoopConfig = node.parse_config()?;

        let state = initialize_loop(&config, ctx, self.max_iterations)?;
        let variables = get_loop_context_variables(&state);

        ctx.step_with_data(
            "loop",
            format!(
                "Initialised {:?} loop: max {} iterations, continue={}",
                state.loop_type, state.max_iterations, state.should_continue
            ),
            Value::Object(variables.clone()),
        );

        Ok(NodeOutput::success(
            node,
            json!({
                "state": state,
                "variables": variables,
            }),
            started_at,
            ctx.now(),
        ))
    }
}
