use serde_json::Value;

/// Normalize a condition operand.
///
/// Missing and null become `Null`, primitives pass through unchanged,
/// objects and arrays become their compact JSON text.
pub fn normalize(value: Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(v @ Value::Object(_)) | Some(v @ Value::Array(_)) => Value::String(v.to_string()),
        Some(v) => v,
    }
}

/// Strict equality on normalized operands. Numbers compare by value, so
/// `5` and `5.0` are equal; no cross-type coercion happens.
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Both operands as numbers, or `None` if either is not a number.
pub fn numeric_pair(a: &Value, b: &Value) -> Option<(f64, f64)> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}

/// Both operands as strings, or `None` if either is not a string.
pub fn string_pair<'a>(a: &'a Value, b: &'a Value) -> Option<(&'a str, &'a str)> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some((x.as_str(), y.as_str())),
        _ => None,
    }
}

pub fn is_null_or_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
