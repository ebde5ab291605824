//! Spec validator: raw records to canonical tool descriptors.
//!
//! Validation only looks at `name`, `type` and `description`. Type-specific
//! fields (`command`, `source`, `mcp_name`) belong to the mount adapters.

use serde_json::Value;
use std::fmt;

use super::mounted::JsonObject;

/// The closed set of mountable tool types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolType {
    /// Runs an external command.
    Command,
    /// Evaluates a Rhai script per call.
    Script,
    /// Returns instructions read from a file.
    StaticFileText,
    /// Returns instructions written inline in the spec.
    StaticInlineText,
}

impl ToolType {
    /// Parse a trimmed, lower-cased `type` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "command" | "cli" => Some(Self::Command),
            "script" | "rhai" => Some(Self::Script),
            "static-file-text" | "markdown" => Some(Self::StaticFileText),
            "static-inline-text" | "prompt" => Some(Self::StaticInlineText),
            _ => None,
        }
    }

    /// Canonical tag, also reported in static-text results.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Script => "script",
            Self::StaticFileText => "static-file-text",
            Self::StaticInlineText => "static-inline-text",
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecRejection {
    MissingName,
    MissingType,
    UnsupportedType,
}

impl SpecRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "missing_name",
            Self::MissingType => "missing_type",
            Self::UnsupportedType => "unsupported_type",
        }
    }
}

impl fmt::Display for SpecRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A validated tool spec.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub tool_type: ToolType,
    pub description: String,
    raw: JsonObject,
}

impl ToolDescriptor {
    /// Raw value of any spec field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// A field coerced to trimmed text, `None` when missing or blank.
    pub fn text_field(&self, key: &str) -> Option<String> {
        self.field(key)
            .and_then(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// A field that must be a non-blank string, returned untrimmed.
    pub fn string_field(&self, key: &str) -> Option<&str> {
        self.field(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Free-form `inputs` documentation.
    pub fn inputs(&self) -> Option<&Value> {
        self.field("inputs").filter(|v| !v.is_null())
    }

    /// Free-form `outputs` documentation.
    pub fn outputs(&self) -> Option<&Value> {
        self.field("outputs").filter(|v| !v.is_null())
    }

    /// The identity visible to the host and to nested calls.
    ///
    /// Command tools may override it with `mcp_name`.
    pub fn published_name(&self) -> String {
        if self.tool_type == ToolType::Command {
            if let Some(mcp_name) = self.text_field("mcp_name") {
                return mcp_name;
            }
        }
        self.name.clone()
    }
}

/// Text form of a scalar value; `null` and containers have none.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn trimmed(raw: &JsonObject, key: &str) -> String {
    raw.get(key)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Normalize one parsed record or return the reason it was rejected.
pub fn validate_tool_spec(raw: &JsonObject) -> Result<ToolDescriptor, SpecRejection> {
    let name = trimmed(raw, "name");
    if name.is_empty() {
        return Err(SpecRejection::MissingName);
    }

    let type_tag = trimmed(raw, "type").to_lowercase();
    if type_tag.is_empty() {
        return Err(SpecRejection::MissingType);
    }
    let tool_type = ToolType::parse(&type_tag).ok_or(SpecRejection::UnsupportedType)?;

    let description = raw
        .get("description")
        .and_then(scalar_text)
        .unwrap_or_default();

    Ok(ToolDescriptor {
        name,
        tool_type,
        description,
        raw: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_normalizes_name_type_description() {
        let spec = validate_tool_spec(&raw(json!({
            "name": "  core.echo  ",
            "type": " CLI ",
            "command": "echo"
        })))
        .unwrap();
        assert_eq!(spec.name, "core.echo");
        assert_eq!(spec.tool_type, ToolType::Command);
        assert_eq!(spec.description, "");
    }

    #[test]
    fn test_rejection_codes() {
        assert_eq!(
            validate_tool_spec(&raw(json!({"type": "cli"}))).unwrap_err(),
            SpecRejection::MissingName
        );
        assert_eq!(
            validate_tool_spec(&raw(json!({"name": "   ", "type": "cli"}))).unwrap_err(),
            SpecRejection::MissingName
        );
        assert_eq!(
            validate_tool_spec(&raw(json!({"name": "x"}))).unwrap_err(),
            SpecRejection::MissingType
        );
        let err = validate_tool_spec(&raw(json!({"name": "x", "type": "wasm"}))).unwrap_err();
        assert_eq!(err, SpecRejection::UnsupportedType);
        assert_eq!(err.code(), "unsupported_type");
    }

    #[test]
    fn test_does_not_inspect_type_specific_fields() {
        let spec = validate_tool_spec(&raw(json!({
            "name": "cmd",
            "type": "command",
            "command": ["not", "a", "string"]
        })))
        .unwrap();
        assert_eq!(spec.text_field("command"), None);
    }

    #[test]
    fn test_type_aliases() {
        assert_eq!(ToolType::parse("markdown"), Some(ToolType::StaticFileText));
        assert_eq!(ToolType::parse("prompt"), Some(ToolType::StaticInlineText));
        assert_eq!(ToolType::parse("rhai"), Some(ToolType::Script));
        assert_eq!(
            ToolType::parse("static-inline-text"),
            Some(ToolType::StaticInlineText)
        );
        assert_eq!(ToolType::parse("python"), None);
    }

    #[test]
    fn test_published_name_override_only_for_commands() {
        let command = validate_tool_spec(&raw(json!({
            "name": "nu", "type": "cli", "command": "nu", "mcp_name": " cli.nu "
        })))
        .unwrap();
        assert_eq!(command.published_name(), "cli.nu");

        let prompt = validate_tool_spec(&raw(json!({
            "name": "guide", "type": "prompt", "source": "hi", "mcp_name": "other"
        })))
        .unwrap();
        assert_eq!(prompt.published_name(), "guide");
    }

    #[test]
    fn test_scalar_names_coerced() {
        let spec = validate_tool_spec(&raw(json!({"name": 42, "type": "prompt"}))).unwrap();
        assert_eq!(spec.name, "42");
    }
}
