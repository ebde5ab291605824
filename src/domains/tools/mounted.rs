//! The uniform runtime unit every mount adapter produces.
//!
//! A [`MountedTool`] pairs a published name and descriptive metadata with a
//! [`Runner`]: a synchronous callable taking a [`ToolInput`] and returning a
//! JSON object. The host server and the nested-call dispatcher both use this
//! one surface.

use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::dispatcher::CallStack;
use super::error::ToolError;

/// JSON object used for call results and metadata.
pub type JsonObject = Map<String, Value>;

/// The `log(message)` capability: one diagnostic line per call.
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Default log sink forwarding each line to `tracing`.
pub fn log_tracing() -> LogFn {
    Arc::new(|message: &str| tracing::warn!("{}", message))
}

/// Input accepted by every runner.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ToolInput {
    /// No input was provided.
    #[default]
    Absent,
    /// A plain string.
    Text(String),
    /// A structured JSON object.
    Object(JsonObject),
}

impl ToolInput {
    /// Build an object input from a JSON value that is known to be an object.
    pub fn object(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(map) => Ok(Self::Object(map)),
            other => Err(ToolError::invalid_input(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Map absent input to an empty object, leaving other shapes untouched.
    pub fn or_empty_object(self) -> Self {
        match self {
            Self::Absent => Self::Object(JsonObject::new()),
            other => other,
        }
    }

    /// Payload shape handed to script tools.
    ///
    /// Absent becomes `{}`, a string becomes `{"input": s}`.
    pub fn into_payload(self) -> JsonObject {
        match self {
            Self::Absent => JsonObject::new(),
            Self::Text(text) => {
                let mut payload = JsonObject::new();
                payload.insert("input".to_string(), Value::String(text));
                payload
            }
            Self::Object(map) => map,
        }
    }

    /// The caller's input as sent, with absent mapped to `{}`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Absent => Value::Object(JsonObject::new()),
            Self::Text(text) => Value::String(text),
            Self::Object(map) => Value::Object(map),
        }
    }
}

impl TryFrom<Value> for ToolInput {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(map) => Ok(Self::Object(map)),
            other => Err(ToolError::invalid_input(format!(
                "input must be an object or string when provided, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl TryFrom<Option<Value>> for ToolInput {
    type Error = ToolError;

    fn try_from(value: Option<Value>) -> Result<Self, Self::Error> {
        value.map_or(Ok(Self::Absent), Self::try_from)
    }
}

/// Human name for the JSON type of a value, used in error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

type RunnerFn = dyn Fn(ToolInput, &CallStack) -> Result<JsonObject, ToolError> + Send + Sync;

/// Shared handle to a tool's callable.
#[derive(Clone)]
pub struct Runner(Arc<RunnerFn>);

impl Runner {
    /// Wrap a closure as a runner.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ToolInput, &CallStack) -> Result<JsonObject, ToolError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the runner.
    pub fn call(&self, input: ToolInput, stack: &CallStack) -> Result<JsonObject, ToolError> {
        (self.0)(input, stack)
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Runner(..)")
    }
}

/// One mounted tool, ready to register.
#[derive(Debug, Clone)]
pub struct MountedTool {
    /// Runtime name; the registry checks it against the catalog.
    pub name: String,
    pub description: String,
    /// Opaque documentation passed through from the spec.
    pub inputs_desc: Option<Value>,
    pub outputs_desc: Option<Value>,
    /// Per-tool hints merged into the host registration metadata.
    pub meta: JsonObject,
    pub runner: Runner,
    /// Provenance shown in diagnostics.
    pub source: Value,
    pub source_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_from_value_shapes() {
        assert_eq!(ToolInput::try_from(Value::Null).unwrap(), ToolInput::Absent);
        assert_eq!(
            ToolInput::try_from(json!("a b")).unwrap(),
            ToolInput::Text("a b".to_string())
        );
        assert!(matches!(
            ToolInput::try_from(json!({"args": []})).unwrap(),
            ToolInput::Object(_)
        ));
    }

    #[test]
    fn test_input_rejects_other_shapes() {
        let err = ToolInput::try_from(json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("array"));
        assert!(ToolInput::try_from(json!(42)).is_err());
    }

    #[test]
    fn test_text_payload_is_wrapped() {
        let payload = ToolInput::Text("hi".to_string()).into_payload();
        assert_eq!(Value::Object(payload), json!({"input": "hi"}));
        assert!(ToolInput::Absent.into_payload().is_empty());
    }

    #[test]
    fn test_runner_invokes_closure() {
        let runner = Runner::new(|input, _stack| Ok(input.into_payload()));
        let result = runner
            .call(ToolInput::Text("x".to_string()), &CallStack::root())
            .unwrap();
        assert_eq!(result.get("input"), Some(&json!("x")));
    }
}
