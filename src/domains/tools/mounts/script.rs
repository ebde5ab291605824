//! Script tool mount adapter.
//!
//! A script tool is a Rhai file exposing `fn run(input, tools, cwd)`. The file
//! is re-read, compiled and evaluated on every call, so edits take effect
//! without a restart and no state leaks between calls.
//!
//! `tools` is the capability table scripts use to reach other mounted tools:
//!
//! ```rhai
//! fn run(input, tools, cwd) {
//!     let listing = tools.call_text("cli.ls", #{ args: ["-1", cwd] });
//!     #{ files: listing.split("\n").len() }
//! }
//! ```

use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{AST, Dynamic, Engine, EvalAltResult, Position, Scope};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

use super::MountContext;
use crate::domains::tools::dispatcher::{CallStack, Dispatcher};
use crate::domains::tools::error::ToolError;
use crate::domains::tools::mounted::{JsonObject, MountedTool, Runner, ToolInput};
use crate::domains::tools::validation::ToolDescriptor;

/// Entry point every script must define.
pub const ENTRY_POINT: &str = "run";

/// Tool the `nushell` wrapper forwards to.
pub const NUSHELL_TOOL: &str = "cli.nu";

/// Pick the primary text out of a nested tool result.
///
/// `stdout` wins over `text`, which wins over `stderr`; anything else is
/// rendered as JSON.
pub fn result_text(result: &JsonObject) -> String {
    ["stdout", "text", "stderr"]
        .iter()
        .find_map(|key| result.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| Value::Object(result.clone()).to_string())
}

/// Capability table handed to a script as its `tools` argument.
#[derive(Debug, Clone)]
pub struct ToolKit {
    dispatcher: Dispatcher,
    stack: CallStack,
}

impl ToolKit {
    pub fn new(dispatcher: Dispatcher, stack: CallStack) -> Self {
        Self { dispatcher, stack }
    }

    /// Forward to another mounted tool.
    pub fn call(&self, name: &str, input: ToolInput) -> Result<JsonObject, ToolError> {
        self.dispatcher.call(name, input, &self.stack)
    }

    /// Forward and keep only the result's primary text.
    pub fn call_text(&self, name: &str, input: ToolInput) -> Result<String, ToolError> {
        self.call(name, input).map(|result| result_text(&result))
    }

    /// Run a Nushell snippet through the regular `cli.nu` tool.
    pub fn nushell(&self, script: &str) -> Result<String, ToolError> {
        if script.trim().is_empty() {
            return Err(ToolError::invalid_input("script is required"));
        }
        let input = ToolInput::object(json!({ "args": ["-c", script] }))?;
        self.call_text(NUSHELL_TOOL, input)
    }
}

fn raise(err: ToolError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(Dynamic::from(err), Position::NONE))
}

fn input_from_dynamic(input: &Dynamic) -> Result<ToolInput, ToolError> {
    let value: Value = from_dynamic(input).map_err(|e| ToolError::invalid_input(e.to_string()))?;
    ToolInput::try_from(value)
}

fn object_to_dynamic(result: JsonObject) -> Result<Dynamic, Box<EvalAltResult>> {
    to_dynamic(Value::Object(result))
}

fn script_call(kit: &ToolKit, name: &str, input: Dynamic) -> Result<Dynamic, Box<EvalAltResult>> {
    let input = input_from_dynamic(&input).map_err(raise)?;
    let result = kit.call(name, input).map_err(raise)?;
    object_to_dynamic(result)
}

fn script_call_text(kit: &ToolKit, name: &str, input: Dynamic) -> Result<String, Box<EvalAltResult>> {
    let input = input_from_dynamic(&input).map_err(raise)?;
    kit.call_text(name, input).map_err(raise)
}

/// Engine with the `Tools` type and its methods registered.
fn build_engine() -> Engine {
    let mut engine = Engine::new();
    engine.on_print(|text| debug!(target: "tool_script", "{}", text));
    engine.on_debug(|text, source, pos| {
        debug!(target: "tool_script", "{} @ {:?} {}", text, source, pos)
    });
    engine
        .register_type_with_name::<ToolKit>("Tools")
        .register_fn("call_tool", |kit: &mut ToolKit, name: &str| {
            script_call(kit, name, Dynamic::UNIT)
        })
        .register_fn("call_tool", |kit: &mut ToolKit, name: &str, input: Dynamic| {
            script_call(kit, name, input)
        })
        .register_fn("call_text", |kit: &mut ToolKit, name: &str| {
            script_call_text(kit, name, Dynamic::UNIT)
        })
        .register_fn("call_text", |kit: &mut ToolKit, name: &str, input: Dynamic| {
            script_call_text(kit, name, input)
        })
        .register_fn("nushell", |kit: &mut ToolKit, script: &str| {
            kit.nushell(script).map_err(raise)
        });
    engine
}

/// A nested-call failure raised inside the script keeps its original kind.
fn find_tool_error(err: &EvalAltResult) -> Option<ToolError> {
    match err {
        EvalAltResult::ErrorRuntime(value, _) => value.clone().try_cast::<ToolError>(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => find_tool_error(inner),
        _ => None,
    }
}

fn script_error(path: &Path, err: &EvalAltResult) -> ToolError {
    find_tool_error(err)
        .unwrap_or_else(|| ToolError::execution_failed(format!("{}: {}", path.display(), err)))
}

/// A script file bound at mount time.
#[derive(Debug, Clone)]
pub struct ScriptModule {
    path: PathBuf,
    dispatcher: Dispatcher,
}

impl ScriptModule {
    pub fn new(path: PathBuf, dispatcher: Dispatcher) -> Self {
        Self { path, dispatcher }
    }

    fn load(&self, engine: &Engine) -> Result<AST, ToolError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            ToolError::execution_failed(format!(
                "unable to load tool script {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let ast = engine.compile(&text).map_err(|e| {
            ToolError::execution_failed(format!("{}: {}", self.path.display(), e))
        })?;

        let has_entry = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 3);
        if !has_entry {
            return Err(ToolError::execution_failed(format!(
                "tool script missing {}(input, tools, cwd) in {}",
                ENTRY_POINT,
                self.path.display()
            )));
        }
        Ok(ast)
    }

    /// Load and evaluate the script's entry point once.
    #[instrument(skip_all, fields(script = %self.path.display()))]
    pub fn run(&self, payload: JsonObject, stack: &CallStack) -> Result<JsonObject, ToolError> {
        let engine = build_engine();
        let ast = self.load(&engine)?;

        let input = to_dynamic(Value::Object(payload))
            .map_err(|e| ToolError::internal(format!("input conversion failed: {}", e)))?;
        let tools = ToolKit::new(self.dispatcher.clone(), stack.clone());
        let cwd = self
            .path
            .parent()
            .map(|dir| dir.to_string_lossy().to_string())
            .unwrap_or_default();

        let output: Dynamic = engine
            .call_fn(&mut Scope::new(), &ast, ENTRY_POINT, (input, tools, cwd))
            .map_err(|e| script_error(&self.path, &e))?;

        let value: Value = from_dynamic(&output).map_err(|e| {
            ToolError::execution_failed(format!(
                "{}: result is not JSON-compatible: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(match value {
            Value::Object(map) => map,
            other => {
                let mut wrapped = JsonObject::new();
                wrapped.insert("result".to_string(), other);
                wrapped
            }
        })
    }
}

/// Build one mounted script tool.
pub fn build_script_mount(tool: &ToolDescriptor, ctx: &MountContext<'_>) -> Option<MountedTool> {
    let Some(source) = tool.string_field("source") else {
        (ctx.log)(&format!(
            "[mcp-server] tool {} missing source for {}",
            tool.name, tool.tool_type
        ));
        return None;
    };
    let source_path = ctx.spec_dir().join(source);
    if !source_path.exists() {
        (ctx.log)(&format!(
            "[mcp-server] tool {} {} source not found: {}",
            tool.name,
            tool.tool_type,
            source_path.display()
        ));
        return None;
    }

    let module = ScriptModule::new(source_path.clone(), ctx.dispatcher.clone());
    let runner = Runner::new(move |input, stack| module.run(input.into_payload(), stack));

    Some(MountedTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        inputs_desc: tool.inputs().cloned(),
        outputs_desc: tool.outputs().cloned(),
        meta: JsonObject::new(),
        runner,
        source: Value::String(source.to_string()),
        source_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::dispatcher::{Catalog, DEFAULT_MAX_CALL_DEPTH};
    use std::fs;
    use tempfile::TempDir;

    fn sealed_dispatcher(entries: Vec<(&str, Runner)>) -> Dispatcher {
        let dispatcher = Dispatcher::unsealed(DEFAULT_MAX_CALL_DEPTH);
        let catalog: Catalog = entries
            .into_iter()
            .map(|(name, runner)| (name.to_string(), runner))
            .collect();
        dispatcher.seal(catalog).unwrap();
        dispatcher
    }

    fn script(temp: &TempDir, body: &str, dispatcher: Dispatcher) -> ScriptModule {
        let path = temp.path().join("tool.rhai");
        fs::write(&path, body).unwrap();
        ScriptModule::new(path, dispatcher)
    }

    fn payload(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_runs_entry_point_with_input_and_cwd() {
        let temp = TempDir::new().unwrap();
        let module = script(
            &temp,
            "fn run(input, tools, cwd) { #{ got: input.value, cwd: cwd } }",
            sealed_dispatcher(vec![]),
        );
        let result = module
            .run(payload(json!({"value": "v1"})), &CallStack::root())
            .unwrap();
        assert_eq!(result.get("got"), Some(&json!("v1")));
        assert_eq!(
            result.get("cwd"),
            Some(&json!(temp.path().to_string_lossy()))
        );
    }

    #[test]
    fn test_non_map_result_is_wrapped() {
        let temp = TempDir::new().unwrap();
        let module = script(
            &temp,
            "fn run(input, tools, cwd) { 6 * 7 }",
            sealed_dispatcher(vec![]),
        );
        let result = module.run(JsonObject::new(), &CallStack::root()).unwrap();
        assert_eq!(Value::Object(result), json!({"result": 42}));
    }

    #[test]
    fn test_script_reloaded_on_every_call() {
        let temp = TempDir::new().unwrap();
        let module = script(
            &temp,
            r#"fn run(input, tools, cwd) { "first" }"#,
            sealed_dispatcher(vec![]),
        );
        let first = module.run(JsonObject::new(), &CallStack::root()).unwrap();
        fs::write(
            temp.path().join("tool.rhai"),
            r#"fn run(input, tools, cwd) { "second" }"#,
        )
        .unwrap();
        let second = module.run(JsonObject::new(), &CallStack::root()).unwrap();
        assert_eq!(first.get("result"), Some(&json!("first")));
        assert_eq!(second.get("result"), Some(&json!("second")));
    }

    #[test]
    fn test_missing_entry_point() {
        let temp = TempDir::new().unwrap();
        let module = script(&temp, "fn main() { 1 }", sealed_dispatcher(vec![]));
        let err = module.run(JsonObject::new(), &CallStack::root()).unwrap_err();
        assert_eq!(err.kind(), "execution_failed");
        assert!(err.to_string().contains("missing run"));
    }

    #[test]
    fn test_script_runtime_error_is_execution_failed() {
        let temp = TempDir::new().unwrap();
        let module = script(
            &temp,
            r#"fn run(input, tools, cwd) { throw "boom"; }"#,
            sealed_dispatcher(vec![]),
        );
        let err = module.run(JsonObject::new(), &CallStack::root()).unwrap_err();
        assert_eq!(err.kind(), "execution_failed");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_nested_call_returns_exact_result() {
        let temp = TempDir::new().unwrap();
        let echo = Runner::new(|input, _stack| {
            let mut result = input.into_payload();
            result.insert("echoed".to_string(), json!(true));
            Ok(result)
        });
        let module = script(
            &temp,
            r#"fn run(input, tools, cwd) { tools.call_tool("core.echo", #{ a: 1, b: "two" }) }"#,
            sealed_dispatcher(vec![("core.echo", echo)]),
        );
        let result = module.run(JsonObject::new(), &CallStack::root()).unwrap();
        assert_eq!(
            Value::Object(result),
            json!({"a": 1, "b": "two", "echoed": true})
        );
    }

    #[test]
    fn test_nested_unknown_tool_keeps_kind() {
        let temp = TempDir::new().unwrap();
        let module = script(
            &temp,
            r#"fn run(input, tools, cwd) { tools.call_tool("does.not.exist") }"#,
            sealed_dispatcher(vec![]),
        );
        let err = module.run(JsonObject::new(), &CallStack::root()).unwrap_err();
        assert_eq!(err, ToolError::unknown_tool("does.not.exist"));
    }

    #[test]
    fn test_call_text_and_nushell_wrappers() {
        let temp = TempDir::new().unwrap();
        let nu = Runner::new(|input, _stack| {
            let args = input.into_payload().get("args").cloned().unwrap_or_default();
            let mut result = JsonObject::new();
            result.insert("stdout".to_string(), json!(args.to_string()));
            result.insert("text".to_string(), json!("ignored"));
            Ok(result)
        });
        let note = Runner::new(|_input, _stack| {
            let mut result = JsonObject::new();
            result.insert("text".to_string(), json!("note text"));
            Ok(result)
        });
        let module = script(
            &temp,
            r#"fn run(input, tools, cwd) {
                #{ nu: tools.nushell("1 + 1"), note: tools.call_text("note", #{}) }
            }"#,
            sealed_dispatcher(vec![(NUSHELL_TOOL, nu), ("note", note)]),
        );
        let result = module.run(JsonObject::new(), &CallStack::root()).unwrap();
        assert_eq!(result.get("nu"), Some(&json!(r#"["-c","1 + 1"]"#)));
        assert_eq!(result.get("note"), Some(&json!("note text")));
    }

    #[test]
    fn test_result_text_priority() {
        let both = payload(json!({"stderr": "e", "text": "t"}));
        assert_eq!(result_text(&both), "t");
        let only_err = payload(json!({"stderr": "e", "exit_code": 1}));
        assert_eq!(result_text(&only_err), "e");
        let none = payload(json!({"value": 3}));
        assert_eq!(result_text(&none), r#"{"value":3}"#);
    }
}
