use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::core::execution_context::ExecutionContext;

fn reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("reference pattern is a valid regex")
    })
}

/// Strip optional `{{ }}` delimiters and surrounding whitespace.
fn strip_braces(path: &str) -> &str {
    let trimmed = path.trim();
    trimmed
        .strip_prefix("{{")
        .and_then(|p| p.strip_suffix("}}"))
        .unwrap_or(trimmed)
        .trim()
}

/// Resolve a `{{name.path}}` reference.
///
/// The first segment names a node (by `name`, not `id`); its output `data`
/// is then walked one property at a time. Array elements are addressed by
/// numeric segments and `length` yields an array or string length. When no
/// node carries the name, the first segment is looked up in the global
/// variables instead, which is where loop bodies find `item`, `index` and
/// `loop`. Any missing segment yields `None`.
pub fn resolve(path: &str, ctx: &ExecutionContext) -> Option<Value> {
    let path = strip_braces(path);
    let mut segments = path.split('.').map(str::trim);
    let root_name = segments.next().filter(|s| !s.is_empty())?;

    let root = match ctx.node_output(root_name) {
        Some(output) => &output.data,
        None => ctx.global_variable(root_name)?,
    };

    let mut current = root;
    let mut length: Option<Value> = None;
    for segment in segments {
        if length.is_some() {
            return None;
        }
        current = match current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => v,
                None => return None,
            },
            Value::Array(items) => {
                if segment == "length" {
                    length = Some(Value::from(items.len()));
                    continue;
                }
                segment.parse::<usize>().ok().and_then(|i| items.get(i))?
            }
            Value::String(s) if segment == "length" => {
                length = Some(Value::from(s.chars().count()));
                continue;
            }
            _ => return None,
        };
    }
    Some(length.unwrap_or_else(|| current.clone()))
}

/// Replace every `{{...}}` in `template`.
///
/// Strings, numbers and booleans are inlined; objects and arrays are
/// rendered as two-space-indented JSON; unresolved references and nulls
/// become an empty string. Never fails.
pub fn substitute(template: &str, ctx: &ExecutionContext) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    reference_regex()
        .replace_all(template, |caps: &Captures| match resolve(&caps[1], ctx) {
            Some(value) => render_value(&value),
            None => String::new(),
        })
        .into_owned()
}

/// List every reference path in `template`, in order of appearance.
pub fn extract_references(template: &str) -> Vec<String> {
    reference_regex()
        .captures_iter(template)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

/// References in `template` that do not currently resolve.
pub fn unresolved_references(template: &str, ctx: &ExecutionContext) -> Vec<String> {
    extract_references(template)
        .into_iter()
        .filter(|path| resolve(path, ctx).is_none())
        .collect()
}

/// Resolve a configuration value that may itself be a reference.
///
/// A string consisting of exactly one `{{...}}` reference resolves to the
/// referenced value with its type preserved (missing → `Null`). Strings with
/// embedded references are substituted. Everything else is returned as is.
pub fn resolve_operand(value: &Value, ctx: &ExecutionContext) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };
    let trimmed = s.trim();
    if let Some(caps) = reference_regex().captures(trimmed) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(trimmed.len()) {
            return resolve(&caps[1], ctx).unwrap_or(Value::Null);
        }
        return Value::String(substitute(s, ctx));
    }
    value.clone()
}

/// Render a value the way it appears inside substituted text.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => render_number(n),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn render_number(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
        }
    }
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::execution::NodeOutput;
    use crate::domain::model::{Node, NodeType};
    use chrono::Utc;
    use serde_json::json;

    fn ctx_with(outputs: Vec<(&str, Value)>) -> ExecutionContext {
        let mut ctx = ExecutionContext::new("e1", "w1");
        for (i, (name, data)) in outputs.into_iter().enumerate() {
            let node = Node::new(format!("n{}", i), NodeType::Data, name, Value::Null);
            let now = Utc::now();
            ctx.set_node_output(NodeOutput::success(&node, data, now, now));
        }
        ctx
    }

    #[test]
    fn test_resolve_nested() {
        let ctx = ctx_with(vec![("Input", json!({"user": {"name": "Alice"}}))]);
        assert_eq!(resolve("{{Input.user.name}}", &ctx), Some(json!("Alice")));
        assert_eq!(resolve("Input.user.name", &ctx), Some(json!("Alice")));
        assert_eq!(resolve("{{ Input.user }}", &ctx), Some(json!({"name": "Alice"})));
    }

    #[test]
    fn test_resolve_missing_segment() {
        let ctx = ctx_with(vec![("Input", json!({"user": {"name": "Alice"}}))]);
        assert_eq!(resolve("{{Input.user.age}}", &ctx), None);
        assert_eq!(resolve("{{Input.user.name.first}}", &ctx), None);
        assert_eq!(resolve("{{Missing.x}}", &ctx), None);
        assert_eq!(resolve("{{}}", &ctx), None);
    }

    #[test]
    fn test_resolve_array_index_and_length() {
        let ctx = ctx_with(vec![("List", json!({"items": ["a", "b"]}))]);
        assert_eq!(resolve("{{List.items.1}}", &ctx), Some(json!("b")));
        assert_eq!(resolve("{{List.items.length}}", &ctx), Some(json!(2)));
        assert_eq!(resolve("{{List.items.5}}", &ctx), None);
    }

    #[test]
    fn test_resolve_falls_back_to_globals() {
        let mut ctx = ctx_with(vec![]);
        ctx.set_global_variable("loop", json!({"index": 2}));
        assert_eq!(resolve("{{loop.index}}", &ctx), Some(json!(2)));
    }

    #[test]
    fn test_node_name_shadows_global() {
        let mut ctx = ctx_with(vec![("item", json!({"v": "node"}))]);
        ctx.set_global_variable("item", json!({"v": "global"}));
        assert_eq!(resolve("{{item.v}}", &ctx), Some(json!("node")));
    }

    #[test]
    fn test_substitute_primitives_and_objects() {
        let ctx = ctx_with(vec![(
            "A",
            json!({"s": "hi", "n": 3, "f": 2.5, "b": true, "o": {"k": 1}}),
        )]);
        assert_eq!(
            substitute("{{A.s}} {{A.n}} {{A.f}} {{A.b}}", &ctx),
            "hi 3 2.5 true"
        );
        assert_eq!(substitute("{{A.o}}", &ctx), "{\n  \"k\": 1\n}");
    }

    #[test]
    fn test_substitute_unresolved_is_empty() {
        let ctx = ctx_with(vec![]);
        assert_eq!(substitute("Hello {{User.name}}", &ctx), "Hello ");
        assert_eq!(substitute("no refs", &ctx), "no refs");
        assert_eq!(substitute("{{a}}{{b}}", &ctx), "");
        assert_eq!(substitute("{{ unclosed", &ctx), "{{ unclosed");
    }

    #[test]
    fn test_whole_number_float_renders_as_integer() {
        let ctx = ctx_with(vec![("A", json!({"f": 5.0}))]);
        assert_eq!(substitute("{{A.f}}", &ctx), "5");
    }

    #[test]
    fn test_extract_references() {
        let refs = extract_references("Hello {{ input.name }}, result is {{llm.text}}");
        assert_eq!(refs, vec!["input.name", "llm.text"]);
    }

    #[test]
    fn test_resolve_operand() {
        let ctx = ctx_with(vec![("A", json!({"n": 4}))]);
        assert_eq!(resolve_operand(&json!("{{A.n}}"), &ctx), json!(4));
        assert_eq!(resolve_operand(&json!("n={{A.n}}"), &ctx), json!("n=4"));
        assert_eq!(resolve_operand(&json!("{{A.zz}}"), &ctx), Value::Null);
        assert_eq!(resolve_operand(&json!(7), &ctx), json!(7));
    }
}
