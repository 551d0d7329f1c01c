//! Log payload redaction.
//!
//! Every payload attached to a [`LogEntry`](super::execution_context::LogEntry)
//! passes through a [`Redactor`] before it is stored or streamed.

use serde_json::Value;

pub const REDACTED: &str = "[REDACTED]";

/// `redact(value) -> safeValue`.
pub trait Redactor: Send + Sync {
    fn redact(&self, value: &Value) -> Value;
}

/// Masks values stored under sensitive keys, at any depth.
///
/// Keys are compared case-insensitively with `_` and `-` removed, so
/// `api_key`, `apiKey` and `API-KEY` all match `apikey`.
#[derive(Debug, Clone)]
pub struct KeyRedactor {
    keys: Vec<String>,
}

impl Default for KeyRedactor {
    fn default() -> Self {
        Self::new([
            "apikey",
            "password",
            "secret",
            "token",
            "accesstoken",
            "refreshtoken",
            "authorization",
            "cookie",
            "credentials",
            "privatekey",
        ])
    }
}

impl KeyRedactor {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keys: keys.into_iter().map(|k| normalize_key(k.as_ref())).collect(),
        }
    }

    fn is_sensitive(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.keys.iter().any(|k| *k == key)
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

impl Redactor for KeyRedactor {
    fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| {
                        let v = if self.is_sensitive(k) && !v.is_null() {
                            Value::String(REDACTED.to_string())
                        } else {
                            self.redact(v)
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            ),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.redact(v)).collect()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_keys_masked() {
        let r = KeyRedactor::default();
        let out = r.redact(&json!({
            "model": "gpt",
            "apiKey": "sk-123",
            "headers": {"Authorization": "Bearer x"},
            "items": [{"password": "p"}, {"ok": 1}]
        }));
        assert_eq!(out["model"], "gpt");
        assert_eq!(out["apiKey"], REDACTED);
        assert_eq!(out["headers"]["Authorization"], REDACTED);
        assert_eq!(out["items"][0]["password"], REDACTED);
        assert_eq!(out["items"][1]["ok"], 1);
    }

    #[test]
    fn test_key_normalization() {
        let r = KeyRedactor::default();
        let out = r.redact(&json!({"api_key": "a", "API-KEY": "b", "tokens_used": 3}));
        assert_eq!(out["api_key"], REDACTED);
        assert_eq!(out["API-KEY"], REDACTED);
        assert_eq!(out["tokens_used"], 3);
    }

    #[test]
    fn test_null_left_alone() {
        let out = KeyRedactor::default().redact(&json!({"token": null}));
        assert!(out["token"].is_null());
    }
}
