//! Static-text tool mounts.
//!
//! Prompt tools do no work themselves: every call returns the stored
//! instructions followed by the caller's input, serialized as JSON after an
//! `input: ` marker so text-only consumers can recover it.

use serde_json::Value;
use std::path::PathBuf;

use super::MountContext;
use crate::domains::tools::mounted::{JsonObject, MountedTool, Runner};
use crate::domains::tools::validation::ToolDescriptor;

/// Prefix of every static-text result.
pub const PROMPT_TOOL_RESPONSE_HINT: &str = "Tool behavior: this tool does not execute the task. \
     It only returns instructions for you (the calling LM) to follow using other tools.";

/// Hint attached to every static-text tool registration.
pub const PROMPT_TOOL_META_HINT: &str =
    "Prompt/markdown tool: treat `text` as execution instructions, not a final answer.";

/// Marker preceding the serialized input in `text`.
pub const INPUT_MARKER: &str = "input: ";

/// Copy of `value` with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact JSON with sorted keys.
pub fn canonical_json(payload: &Value) -> String {
    canonicalize(payload).to_string()
}

/// Render the `text` field for one call.
pub fn render_prompt(prompt_text: &str, payload: &Value) -> String {
    let input_json = canonical_json(payload);
    format!(
        "{}\n\n{}\n\n---\n{}{}",
        PROMPT_TOOL_RESPONSE_HINT, prompt_text, INPUT_MARKER, input_json
    )
}

/// Build a mounted tool that returns `prompt_text` for every call.
pub fn build_text_prompt_mount(
    tool: &ToolDescriptor,
    prompt_text: String,
    source_path: PathBuf,
) -> MountedTool {
    let kind = tool.tool_type;
    let runner = Runner::new(move |input, _stack| {
        let payload = input.into_value();
        let mut result = JsonObject::new();
        result.insert(
            "text".to_string(),
            Value::String(render_prompt(&prompt_text, &payload)),
        );
        result.insert("input".to_string(), payload);
        result.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        Ok(result)
    });

    let mut meta = JsonObject::new();
    meta.insert(
        "prompt_tool_hint".to_string(),
        Value::String(PROMPT_TOOL_META_HINT.to_string()),
    );

    MountedTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        inputs_desc: tool.inputs().cloned(),
        outputs_desc: tool.outputs().cloned(),
        meta,
        runner,
        source: tool.field("source").cloned().unwrap_or(Value::Null),
        source_path,
    }
}

/// Build one inline prompt tool; `source` is the prompt text itself.
pub fn build_prompt_mount(tool: &ToolDescriptor, ctx: &MountContext<'_>) -> Option<MountedTool> {
    let Some(source) = tool.string_field("source") else {
        (ctx.log)(&format!(
            "[mcp-server] tool {} missing source for {}",
            tool.name, tool.tool_type
        ));
        return None;
    };
    Some(build_text_prompt_mount(
        tool,
        source.to_string(),
        ctx.spec_path.to_path_buf(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MountingConfig;
    use crate::domains::tools::dispatcher::{CallStack, DEFAULT_MAX_CALL_DEPTH, Dispatcher};
    use crate::domains::tools::mounted::{LogFn, ToolInput};
    use crate::domains::tools::validation::validate_tool_spec;
    use serde_json::json;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    fn descriptor(value: Value) -> ToolDescriptor {
        match value {
            Value::Object(map) => validate_tool_spec(&map).unwrap(),
            _ => panic!("expected object"),
        }
    }

    fn mount_inline(value: Value) -> (Option<MountedTool>, Vec<String>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let log: LogFn = Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string()));
        let dispatcher = Dispatcher::unsealed(DEFAULT_MAX_CALL_DEPTH);
        let settings = MountingConfig::default();
        let ctx = MountContext {
            spec_path: Path::new("/tools/guide/TOOL.yaml"),
            dispatcher: &dispatcher,
            log: &log,
            settings: &settings,
        };
        let mounted = build_prompt_mount(&descriptor(value), &ctx);
        let lines = lines.lock().unwrap().clone();
        (mounted, lines)
    }

    #[test]
    fn test_inline_prompt_round_trips_input() {
        let (mounted, _) = mount_inline(json!({
            "name": "guide", "type": "prompt", "source": "hello"
        }));
        let mounted = mounted.unwrap();
        assert_eq!(mounted.source_path, Path::new("/tools/guide/TOOL.yaml"));

        let input = json!({"topic": "rust", "nested": {"b": 2, "a": [1, null]}, "flag": true});
        let result = mounted
            .runner
            .call(ToolInput::object(input.clone()).unwrap(), &CallStack::root())
            .unwrap();

        assert_eq!(result.get("input"), Some(&input));
        assert_eq!(result.get("type"), Some(&json!("static-inline-text")));

        let text = result.get("text").and_then(|v| v.as_str()).unwrap();
        assert!(text.starts_with(PROMPT_TOOL_RESPONSE_HINT));
        assert!(text.contains("hello"));
        let suffix = text.rsplit_once(INPUT_MARKER).unwrap().1;
        let recovered: Value = serde_json::from_str(suffix).unwrap();
        assert_eq!(recovered, input);
        assert!(text.ends_with(
            r#"input: {"flag":true,"nested":{"a":[1,null],"b":2},"topic":"rust"}"#
        ));
    }

    #[test]
    fn test_absent_input_echoes_empty_object() {
        let (mounted, _) = mount_inline(json!({
            "name": "guide", "type": "prompt", "source": "hello"
        }));
        let result = mounted
            .unwrap()
            .runner
            .call(ToolInput::Absent, &CallStack::root())
            .unwrap();
        assert_eq!(result.get("input"), Some(&json!({})));
        let text = result.get("text").and_then(|v| v.as_str()).unwrap();
        assert!(text.ends_with("---\ninput: {}"));
    }

    #[test]
    fn test_string_input_echoed_verbatim() {
        let (mounted, _) = mount_inline(json!({
            "name": "guide", "type": "prompt", "source": "hello"
        }));
        let result = mounted
            .unwrap()
            .runner
            .call(ToolInput::Text("go".into()), &CallStack::root())
            .unwrap();
        assert_eq!(result.get("input"), Some(&json!("go")));
        let text = result.get("text").and_then(|v| v.as_str()).unwrap();
        assert!(text.ends_with("---\ninput: \"go\""));
    }

    #[test]
    fn test_meta_hint_attached() {
        let (mounted, _) = mount_inline(json!({
            "name": "guide", "type": "prompt", "source": "hello", "description": "Guide"
        }));
        let mounted = mounted.unwrap();
        assert_eq!(mounted.description, "Guide");
        assert_eq!(
            mounted.meta.get("prompt_tool_hint"),
            Some(&json!(PROMPT_TOOL_META_HINT))
        );
    }

    #[test]
    fn test_missing_source_logged_and_skipped() {
        let (mounted, lines) = mount_inline(json!({"name": "guide", "type": "prompt"}));
        assert!(mounted.is_none());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("guide missing source"));

        let (mounted, _) = mount_inline(json!({
            "name": "guide", "type": "prompt", "source": "   "
        }));
        assert!(mounted.is_none());
    }
}
