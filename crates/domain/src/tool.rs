use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tool definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: Value,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Arguments
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A single model-supplied argument value.
///
/// JSON numbers with no fractional part become [`ArgValue::Integer`]
/// (models routinely send `10.0` for an integer field). Everything that is
/// neither a string nor an integral number is kept as `Structured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Structured(Value),
}

impl From<Value> for ArgValue {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => ArgValue::String(s),
            Value::Number(ref n) => {
                if let Some(i) = n.as_i64() {
                    ArgValue::Integer(i)
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                            ArgValue::Integer(f as i64)
                        }
                        _ => ArgValue::Structured(v),
                    }
                }
            }
            other => ArgValue::Structured(other),
        }
    }
}

impl From<ArgValue> for Value {
    fn from(v: ArgValue) -> Self {
        match v {
            ArgValue::String(s) => Value::String(s),
            ArgValue::Integer(i) => Value::from(i),
            ArgValue::Structured(v) => v,
        }
    }
}

/// Named arguments of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArgs(BTreeMap<String, ArgValue>);

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the raw JSON the model produced. Anything other than an
    /// object yields an empty argument set.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Object(map) => Self(
                map.iter()
                    .map(|(k, v)| (k.clone(), ArgValue::from(v.clone())))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.get(key)
    }

    /// The value of `key` when it is a string.
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(ArgValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value of `key` when it is an integer.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(ArgValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.string(key).unwrap_or(default).to_owned()
    }

    pub fn integer_or(&self, key: &str, default: i64) -> i64 {
        self.integer(key).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ArgValue {
    fn from(s: &str) -> Self {
        ArgValue::String(s.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(s: String) -> Self {
        ArgValue::String(s)
    }
}

impl From<i64> for ArgValue {
    fn from(i: i64) -> Self {
        ArgValue::Integer(i)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Invocation / result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A model-issued request to run a named tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call_id: String,
    pub name: String,
    pub args: ToolArgs,
}

/// Outcome of one tool invocation: a payload for the model or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Map<String, Value>),
    Failure(String),
}

/// A tool outcome paired with the invocation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(invocation: &ToolInvocation, payload: Map<String, Value>) -> Self {
        Self {
            call_id: invocation.call_id.clone(),
            name: invocation.name.clone(),
            outcome: ToolOutcome::Success(payload),
        }
    }

    pub fn failure(invocation: &ToolInvocation, message: impl Into<String>) -> Self {
        Self {
            call_id: invocation.call_id.clone(),
            name: invocation.name.clone(),
            outcome: ToolOutcome::Failure(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Failure(_))
    }

    /// The function-response body handed back to the model:
    /// `{"result": ...}` or `{"error": "..."}`.
    pub fn response_body(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success(payload) => {
                serde_json::json!({ "result": Value::Object(payload.clone()) })
            }
            ToolOutcome::Failure(message) => serde_json::json!({ "error": message }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_floats_become_integers() {
        let args = ToolArgs::from_json(&json!({ "max_results": 5.0, "page_size": 7 }));
        assert_eq!(args.integer("max_results"), Some(5));
        assert_eq!(args.integer("page_size"), Some(7));
    }

    #[test]
    fn fractional_numbers_stay_structured() {
        let args = ToolArgs::from_json(&json!({ "ratio": 0.5 }));
        assert_eq!(args.integer("ratio"), None);
        assert!(matches!(args.get("ratio"), Some(ArgValue::Structured(_))));
    }

    #[test]
    fn mistyped_lookups_fall_back_to_defaults() {
        let args = ToolArgs::from_json(&json!({ "calendar_id": 3, "max_results": "ten" }));
        assert_eq!(args.string_or("calendar_id", "primary"), "primary");
        assert_eq!(args.integer_or("max_results", 10), 10);
    }

    #[test]
    fn non_object_arguments_are_empty() {
        assert!(ToolArgs::from_json(&json!(["a", "b"])).is_empty());
        assert!(ToolArgs::from_json(&Value::Null).is_empty());
    }

    #[test]
    fn response_body_shapes() {
        let inv = ToolInvocation {
            call_id: "c1".into(),
            name: "send_email".into(),
            args: ToolArgs::new(),
        };
        let mut payload = Map::new();
        payload.insert("message_id".into(), json!("m-1"));
        assert_eq!(
            ToolResult::success(&inv, payload).response_body(),
            json!({ "result": { "message_id": "m-1" } })
        );
        let failed = ToolResult::failure(&inv, "send_email RPC failed: refused");
        assert!(failed.is_error());
        assert_eq!(
            failed.response_body(),
            json!({ "error": "send_email RPC failed: refused" })
        );
    }
}
