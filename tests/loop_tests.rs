use chrono::Utc;
use serde_json::{json, Value};

use nodeflow::domain::model::LoopConfig;
use nodeflow::nodes::flow::{
    advance_for_loop, advance_while_loop, aggregate_loop_results, apply_loop_variables,
    get_loop_context_variables, initialize_for_loop, initialize_loop, initialize_while_loop,
    should_loop_continue,
};
use nodeflow::{
    substitute, Condition, ConditionOperator, ExecutionContext, Node, NodeOutput, NodeType,
};

fn set_output(ctx: &mut ExecutionContext, name: &str, data: Value) {
    let node = Node::new(format!("id-{}", name), NodeType::Data, name, Value::Null);
    let now = Utc::now();
    ctx.set_node_output(NodeOutput::success(&node, data, now, now));
}

fn for_config(max: usize) -> LoopConfig {
    serde_json::from_value(json!({
        "loopType": "FOR",
        "maxIterations": max,
        "forConfig": {"arrayVariable": "{{Source.items}}", "itemName": "letter", "indexName": "pos"}
    }))
    .unwrap()
}

fn while_config(cap: Option<usize>) -> LoopConfig {
    serde_json::from_value(json!({
        "loopType": "WHILE",
        "whileConfig": {
            "condition": {"variable": "{{counter.value}}", "operator": "lessThan", "value": 5},
            "maxIterations": cap
        }
    }))
    .unwrap()
}

#[test]
fn test_for_loop_walks_the_array() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "Source", json!({"items": ["a", "b", "c"]}));

    let s0 = initialize_for_loop(&for_config(10), &ctx).unwrap();
    assert_eq!(s0.current_index, 0);
    assert_eq!(s0.current_item, Some(json!("a")));
    assert!(s0.should_continue);
    assert_eq!(s0.max_iterations, 3);

    let s1 = advance_for_loop(&s0);
    assert_eq!((s1.current_item.clone(), s1.should_continue), (Some(json!("b")), true));
    let s2 = advance_for_loop(&s1);
    assert_eq!((s2.current_item.clone(), s2.should_continue), (Some(json!("c")), true));
    let s3 = advance_for_loop(&s2);
    assert_eq!((s3.current_item.clone(), s3.should_continue), (None, false));
    assert!(!should_loop_continue(&s3));

    // transitions never mutate their input
    assert_eq!(s0.current_index, 0);
}

#[test]
fn test_for_loop_configured_cap() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "Source", json!({"items": [1, 2, 3, 4, 5]}));

    let mut state = initialize_for_loop(&for_config(2), &ctx).unwrap();
    let mut seen = 0;
    while should_loop_continue(&state) {
        seen += 1;
        state = advance_for_loop(&state);
    }
    assert_eq!(seen, 2);
}

#[test]
fn test_for_loop_rejects_non_array() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "Source", json!({"items": "abc"}));
    let err = initialize_for_loop(&for_config(10), &ctx).unwrap_err();
    assert!(err.is_fatal());
    assert!(!err.is_retryable());
}

#[test]
fn test_empty_array_never_runs() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "Source", json!({"items": []}));
    let state = initialize_for_loop(&for_config(10), &ctx).unwrap();
    assert!(!should_loop_continue(&state));
    assert_eq!(state.current_item, None);
}

#[test]
fn test_while_loop_sees_current_context() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "counter", json!({"value": 3}));
    let config = while_config(None);
    let condition = config.while_config.clone().unwrap().condition;

    let s0 = initialize_while_loop(&config, &ctx).unwrap();
    assert!(s0.should_continue);

    set_output(&mut ctx, "counter", json!({"value": 4}));
    let s1 = advance_while_loop(&s0, &condition, &ctx);
    assert!(should_loop_continue(&s1));

    set_output(&mut ctx, "counter", json!({"value": 5}));
    let s2 = advance_while_loop(&s1, &condition, &ctx);
    assert!(!should_loop_continue(&s2));
    assert_eq!(s2.iterations_completed, 2);
}

#[test]
fn test_while_loop_never_exceeds_ceiling() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "counter", json!({"value": 0}));
    let config = while_config(Some(3));
    let condition = config.while_config.clone().unwrap().condition;

    let mut state = initialize_while_loop(&config, &ctx).unwrap();
    let mut runs = 0;
    while should_loop_continue(&state) {
        runs += 1;
        state = advance_while_loop(&state, &condition, &ctx);
    }
    assert_eq!(runs, 3);
    assert!(state.iterations_completed <= state.max_iterations);
}

#[test]
fn test_global_ceiling_applies() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "counter", json!({"value": 0}));
    let state = initialize_loop(&while_config(Some(50)), &ctx, 7).unwrap();
    assert_eq!(state.max_iterations, 7);
}

#[test]
fn test_missing_while_config_is_fatal() {
    let ctx = ExecutionContext::new("e1", "w1");
    let config: LoopConfig = serde_json::from_value(json!({"loopType": "WHILE"})).unwrap();
    assert!(initialize_while_loop(&config, &ctx).unwrap_err().is_fatal());
}

#[test]
fn test_loop_variables_in_body_templates() {
    let mut ctx = ExecutionContext::new("e1", "w1");
    set_output(&mut ctx, "Source", json!({"items": ["a", "b"]}));
    let state = advance_for_loop(&initialize_for_loop(&for_config(10), &ctx).unwrap());

    let vars = get_loop_context_variables(&state);
    assert_eq!(vars["iteration"], json!(2));
    assert_eq!(vars["isFirst"], json!(false));
    assert_eq!(vars["isLast"], json!(true));
    assert_eq!(vars["letter"], json!("b"));
    assert_eq!(vars["pos"], json!(1));

    apply_loop_variables(&mut ctx, &state);
    assert_eq!(
        substitute("{{item}} {{letter}} #{{loop.iteration}}", &ctx),
        "b b #2"
    );
}

#[test]
fn test_aggregate_keeps_failures() {
    let node = Node::new("b1", NodeType::Code, "Body", Value::Null);
    let now = Utc::now();
    let results = vec![
        NodeOutput::success(&node, json!(1), now, now),
        NodeOutput::failure(&node, "boom", now, now),
        NodeOutput::success(&node, json!(3), now, now),
    ];
    let agg = aggregate_loop_results(&results);
    assert_eq!(agg.iterations, 3);
    assert!(!agg.all_succeeded);
    assert_eq!(agg.results[2].data, json!(3));
}
