//! FOR/WHILE iteration state machine.
//!
//! [`LoopState`] is a value snapshot: every transition returns a new state
//! and leaves its input untouched. Running the loop body and deciding when to
//! call `advance_*` belongs to whoever embeds the engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::execution_context::ExecutionContext;
use crate::domain::execution::NodeOutput;
use crate::domain::model::{Condition, LoopConfig, LoopType};
use crate::error::{ErrorCode, ErrorContext, NodeError, NodeResult};
use crate::evaluator::evaluate;
use crate::template::resolve;

/// Global iteration ceiling applied to every loop.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopState {
    pub current_index: usize,
    pub iterations_completed: usize,
    pub should_continue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_item: Option<Value>,
    /// The iterated sequence. FOR loops only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<Vec<Value>>,
    /// Effective ceiling, already capped.
    pub max_iterations: usize,
    pub loop_type: LoopType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

/// Outcome of a finished (or abandoned) loop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopAggregate {
    pub iterations: usize,
    pub results: Vec<NodeOutput>,
    pub all_succeeded: bool,
}

fn fatal_config(message: String) -> NodeError {
    NodeError::config(message.clone())
        .with_context(ErrorContext::fatal(ErrorCode::ConfigError, message))
}

fn effective_max(configured: Option<usize>, ceiling: usize) -> usize {
    configured.unwrap_or(ceiling).min(ceiling)
}

/// Initialise either loop kind, capping at `ceiling`.
pub fn initialize_loop(
    config: &LoopConfig,
    ctx: &ExecutionContext,
    ceiling: usize,
) -> NodeResult<LoopState> {
    match config.loop_type {
        LoopType::For => initialize_for_loop_capped(config, ctx, ceiling),
        LoopType::While => initialize_while_loop_capped(config, ctx, ceiling),
    }
}

pub fn initialize_for_loop(config: &LoopConfig, ctx: &ExecutionContext) -> NodeResult<LoopState> {
    initialize_for_loop_capped(config, ctx, DEFAULT_MAX_ITERATIONS)
}

/// Resolve the configured array and build the initial FOR state.
///
/// A target that does not resolve to an array is a configuration error.
pub fn initialize_for_loop_capped(
    config: &LoopConfig,
    ctx: &ExecutionContext,
    ceiling: usize,
) -> NodeResult<LoopState> {
    let for_config = config
        .for_config
        .as_ref()
        .ok_or_else(|| fatal_config("FOR loop requires forConfig".to_string()))?;

    let array = match resolve(&for_config.array_variable, ctx) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(fatal_config(format!(
                "Loop target {} is not an array (got {})",
                for_config.array_variable,
                type_name(&other)
            )))
        }
        None => {
            return Err(fatal_config(format!(
                "Loop target {} did not resolve",
                for_config.array_variable
            )))
        }
    };

    let max_iterations = effective_max(config.max_iterations, ceiling).min(array.len());

    Ok(LoopState {
        current_index: 0,
        iterations_completed: 0,
        should_continue: max_iterations > 0,
        current_item: array.first().cloned(),
        array: Some(array),
        max_iterations,
        loop_type: LoopType::For,
        item_name: for_config.item_name.clone(),
        index_name: for_config.index_name.clone(),
    })
}

pub fn advance_for_loop(state: &LoopState) -> LoopState {
    let next = state.current_index + 1;
    let len = state.array.as_ref().map_or(0, Vec::len);
    LoopState {
        current_index: next,
        iterations_completed: state.iterations_completed + 1,
        should_continue: next < len && next < state.max_iterations,
        current_item: state.array.as_ref().and_then(|a| a.get(next).cloned()),
        ..state.clone()
    }
}

pub fn initialize_while_loop(config: &LoopConfig, ctx: &ExecutionContext) -> NodeResult<LoopState> {
    initialize_while_loop_capped(config, ctx, DEFAULT_MAX_ITERATIONS)
}

/// Evaluate the while condition once and build the initial WHILE state.
pub fn initialize_while_loop_capped(
    config: &LoopConfig,
    ctx: &ExecutionContext,
    ceiling: usize,
) -> NodeResult<LoopState> {
    let while_config = config
        .while_config
        .as_ref()
        .ok_or_else(|| fatal_config("WHILE loop requires whileConfig".to_string()))?;

    let max_iterations = effective_max(config.max_iterations, ceiling)
        .min(while_config.max_iterations.unwrap_or(ceiling));

    Ok(LoopState {
        current_index: 0,
        iterations_completed: 0,
        should_continue: max_iterations > 0 && evaluate(&while_config.condition, ctx),
        current_item: None,
        array: None,
        max_iterations,
        loop_type: LoopType::While,
        item_name: None,
        index_name: None,
    })
}

/// Re-evaluate `condition` against the context as it is now. The loop stops
/// at the ceiling even if the condition still holds.
pub fn advance_while_loop(
    state: &LoopState,
    condition: &Condition,
    ctx: &ExecutionContext,
) -> LoopState {
    let completed = state.iterations_completed + 1;
    LoopState {
        current_index: state.current_index + 1,
        iterations_completed: completed,
        should_continue: completed < state.max_iterations && evaluate(condition, ctx),
        ..state.clone()
    }
}

/// Per-iteration variables visible to loop-body nodes.
pub fn get_loop_context_variables(state: &LoopState) -> Map<String, Value> {
    let mut vars = Map::new();
    let index = Value::from(state.current_index);
    vars.insert("index".into(), index.clone());
    vars.insert("iteration".into(), Value::from(state.current_index + 1));
    vars.insert("isFirst".into(), Value::Bool(state.current_index == 0));

    match state.loop_type {
        LoopType::For => {
            let len = state.array.as_ref().map_or(0, Vec::len);
            let last = state.current_index + 1 >= len.min(state.max_iterations);
            vars.insert("isLast".into(), Value::Bool(last));

            let item = state.current_item.clone().unwrap_or(Value::Null);
            if let Some(name) = state.item_name.as_deref().filter(|n| !n.is_empty()) {
                vars.insert(name.to_string(), item.clone());
            }
            if let Some(name) = state.index_name.as_deref().filter(|n| !n.is_empty()) {
                vars.insert(name.to_string(), index);
            }
            vars.insert("item".into(), item);
        }
        LoopType::While => {
            vars.insert("isLast".into(), Value::Bool(false));
        }
    }
    vars
}

/// The continuation guard callers must use; `state.should_continue` alone
/// does not account for the ceiling.
pub fn should_loop_continue(state: &LoopState) -> bool {
    state.should_continue && state.iterations_completed < state.max_iterations
}

/// Collect per-iteration outputs. Failed iterations are kept, only flipping
/// `all_succeeded`.
pub fn aggregate_loop_results(results: &[NodeOutput]) -> LoopAggregate {
    LoopAggregate {
        iterations: results.len(),
        all_succeeded: results.iter().all(|r| r.status.is_success()),
        results: results.to_vec(),
    }
}

/// Publish the per-iteration overlay into the context's global variables.
///
/// The whole overlay is visible as `{{loop.*}}`. The item, the index and
/// any configured aliases are also published at the top level so `{{item}}`
/// resolves; the position flags stay under `loop`.
pub fn apply_loop_variables(ctx: &mut ExecutionContext, state: &LoopState) {
    let vars = get_loop_context_variables(state);
    for (key, value) in &vars {
        if matches!(key.as_str(), "iteration" | "isFirst" | "isLast") {
            continue;
        }
        ctx.set_global_variable(key.clone(), value.clone());
    }
    ctx.set_global_variable("loop", Value::Object(vars));
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ForLoopConfig, Node, NodeType};
    use chrono::Utc;
    use serde_json::json;

    fn ctx_with(name: &str, data: Value) -> ExecutionContext {
        let mut ctx = ExecutionContext::new("e1", "w1");
        let node = Node::new("n1", NodeType::Data, name, Value::Null);
        let now = Utc::now();
        ctx.set_node_output(NodeOutput::success(&node, data, now, now));
        ctx
    }

    fn for_config(var: &str, max: Option<usize>) -> LoopConfig {
        LoopConfig {
            loop_type: LoopType::For,
            for_config: Some(ForLoopConfig {
                array_variable: var.to_string(),
                item_name: Some("row".into()),
                index_name: Some("i".into()),
            }),
            while_config: None,
            max_iterations: max,
        }
    }

    #[test]
    fn test_for_loop_caps_at_configured_max() {
        let ctx = ctx_with("list", json!({"items": [1, 2, 3, 4, 5]}));
        let state = initialize_for_loop(&for_config("{{list.items}}", Some(2)), &ctx).unwrap();
        assert_eq!(state.max_iterations, 2);
        let state = advance_for_loop(&state);
        assert!(state.should_continue);
        let state = advance_for_loop(&state);
        assert!(!state.should_continue);
        assert_eq!(state.current_item, Some(json!(3)));
    }

    #[test]
    fn test_for_loop_empty_array() {
        let ctx = ctx_with("list", json!({"items": []}));
        let state = initialize_for_loop(&for_config("{{list.items}}", None), &ctx).unwrap();
        assert!(!state.should_continue);
        assert_eq!(state.current_item, None);
        assert!(!should_loop_continue(&state));
    }

    #[test]
    fn test_for_loop_non_array_is_fatal() {
        let ctx = ctx_with("list", json!({"items": "abc"}));
        let err = initialize_for_loop(&for_config("{{list.items}}", None), &ctx).unwrap_err();
        assert!(err.is_fatal());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("not an array"));
    }

    #[test]
    fn test_advance_does_not_mutate_input() {
        let ctx = ctx_with("list", json!({"items": ["a", "b"]}));
        let first = initialize_for_loop(&for_config("{{list.items}}", None), &ctx).unwrap();
        let second = advance_for_loop(&first);
        assert_eq!(first.current_index, 0);
        assert_eq!(second.current_index, 1);
    }

    #[test]
    fn test_context_variables_aliases() {
        let ctx = ctx_with("list", json!({"items": ["a", "b"]}));
        let state = initialize_for_loop(&for_config("{{list.items}}", None), &ctx).unwrap();
        let vars = get_loop_context_variables(&state);
        assert_eq!(vars["index"], json!(0));
        assert_eq!(vars["iteration"], json!(1));
        assert_eq!(vars["isFirst"], json!(true));
        assert_eq!(vars["isLast"], json!(false));
        assert_eq!(vars["item"], json!("a"));
        assert_eq!(vars["row"], json!("a"));
        assert_eq!(vars["i"], json!(0));

        let vars = get_loop_context_variables(&advance_for_loop(&state));
        assert_eq!(vars["isLast"], json!(true));
    }

    #[test]
    fn test_apply_loop_variables_resolvable() {
        let mut ctx = ctx_with("list", json!({"items": ["a", "b"]}));
        let state = initialize_for_loop(&for_config("{{list.items}}", None), &ctx).unwrap();
        apply_loop_variables(&mut ctx, &advance_for_loop(&state));
        assert_eq!(resolve("{{item}}", &ctx), Some(json!("b")));
        assert_eq!(resolve("{{row}}", &ctx), Some(json!("b")));
        assert_eq!(resolve("{{loop.iteration}}", &ctx), Some(json!(2)));
    }
}
