//! Command tool mount adapter.
//!
//! Runs the configured program as a child process. The exit code is part of
//! the result, so a failing command is data for the caller rather than a
//! call error.

use serde_json::{Value, json};
use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use super::MountContext;
use crate::domains::tools::error::ToolError;
use crate::domains::tools::mounted::{JsonObject, LogFn, MountedTool, Runner, ToolInput, json_kind};
use crate::domains::tools::validation::ToolDescriptor;

/// Hint attached to every command tool registration.
pub const CLI_TOOL_PRE_PROMPT: &str = "This is an MCP tool for running CLI commands. Use the man pages tool and \
     tldr tool to find an accurate command that fits the prompt.";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Arguments for one command invocation, decoded from the call input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRequest {
    pub args: Vec<String>,
    pub stdin: Option<String>,
    pub cwd: Option<String>,
}

impl CommandRequest {
    /// Decode absent, string or object input.
    ///
    /// A string is split with shell-word rules into `args`.
    pub fn from_input(input: ToolInput) -> Result<Self, ToolError> {
        let payload = match input {
            ToolInput::Absent => return Ok(Self::default()),
            ToolInput::Text(text) => {
                let args = shlex::split(&text).ok_or_else(|| {
                    ToolError::invalid_input("input string has unbalanced quotes")
                })?;
                return Ok(Self {
                    args,
                    ..Self::default()
                });
            }
            ToolInput::Object(payload) => payload,
        };

        let args = match payload.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    ToolError::invalid_input("input.args must be a list of strings when provided")
                })?,
            Some(other) => {
                return Err(ToolError::invalid_input(format!(
                    "input.args must be a list of strings when provided, got {}",
                    json_kind(other)
                )));
            }
        };

        Ok(Self {
            args,
            stdin: optional_string(&payload, "stdin")?,
            cwd: optional_string(&payload, "cwd")?,
        })
    }
}

fn optional_string(payload: &JsonObject, key: &str) -> Result<Option<String>, ToolError> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ToolError::invalid_input(format!(
            "input.{} must be a string when provided",
            key
        ))),
    }
}

/// A program bound at mount time.
#[derive(Clone)]
pub struct CommandInvocation {
    program: String,
    timeout: Option<Duration>,
    log: LogFn,
}

impl CommandInvocation {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>, log: LogFn) -> Self {
        Self {
            program: program.into(),
            timeout,
            log,
        }
    }

    /// Run the program and collect `{stdout, stderr, exit_code}`.
    #[instrument(skip_all, fields(program = %self.program))]
    pub fn run(&self, request: &CommandRequest) -> Result<JsonObject, ToolError> {
        let mut command = Command::new(&self.program);
        command
            .args(&request.args)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        debug!("Spawning {} with {} argument(s)", self.program, request.args.len());
        let mut child = command.spawn().map_err(|e| {
            ToolError::execution_failed(format!("failed to spawn `{}`: {}", self.program, e))
        })?;

        // stdin is written concurrently with draining stdout/stderr; a full
        // pipe on either side would otherwise block the other.
        if let (Some(mut pipe), Some(data)) = (child.stdin.take(), request.stdin.clone()) {
            thread::spawn(move || {
                let _ = pipe.write_all(data.as_bytes());
            });
        }
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let status = wait_for(&mut child, self.timeout)?;
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        let exit_code = exit_code(&status);
        if exit_code != 0 {
            (self.log)(&format!(
                "[mcp-server] process failed: cmd={} exit={}",
                self.program, exit_code
            ));
        }

        let mut result = JsonObject::new();
        result.insert("stdout".to_string(), Value::String(stdout));
        result.insert("stderr".to_string(), Value::String(stderr));
        result.insert("exit_code".to_string(), json!(exit_code));
        Ok(result)
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

/// Process exit code; a process killed by signal N reports `-N`.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).trim_end().to_string()
}

fn wait_for(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, ToolError> {
    let wait_error = |e: std::io::Error| ToolError::execution_failed(format!("wait failed: {}", e));

    let Some(timeout) = timeout else {
        return child.wait().map_err(wait_error);
    };

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().map_err(wait_error)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ToolError::Timeout);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Build one mounted command tool.
pub fn build_command_mount(tool: &ToolDescriptor, ctx: &MountContext<'_>) -> Option<MountedTool> {
    let Some(command) = tool.text_field("command") else {
        (ctx.log)(&format!(
            "[mcp-server] tool {} missing command for {}",
            tool.name, tool.tool_type
        ));
        return None;
    };

    let name = tool
        .text_field("mcp_name")
        .or_else(|| Some(tool.name.clone()).filter(|n| !n.is_empty()))
        .unwrap_or_else(|| format!("cli.{}", command));

    let description = if tool.description.is_empty() {
        format!("Run `{}` from the CLI environment.", command)
    } else {
        tool.description.clone()
    };

    let inputs_desc = tool.inputs().cloned().unwrap_or_else(|| {
        json!({
            "args": "Optional list of CLI arguments.",
            "stdin": "Optional stdin string passed to the process.",
            "cwd": "Optional working directory."
        })
    });
    let outputs_desc = tool.outputs().cloned().unwrap_or_else(|| {
        json!({
            "stdout": "Process stdout text.",
            "stderr": "Process stderr text.",
            "exit_code": "Process exit code."
        })
    });

    let mut meta = JsonObject::new();
    meta.insert(
        "tool_pre_prompt".to_string(),
        Value::String(CLI_TOOL_PRE_PROMPT.to_string()),
    );

    let invocation = CommandInvocation::new(
        command.clone(),
        ctx.settings.command_timeout(),
        ctx.log.clone(),
    );
    let runner = Runner::new(move |input, _stack| {
        let request = CommandRequest::from_input(input)?;
        invocation.run(&request)
    });

    Some(MountedTool {
        name,
        description,
        inputs_desc: Some(inputs_desc),
        outputs_desc: Some(outputs_desc),
        meta,
        runner,
        source: json!({ "command": command }),
        source_path: ctx.spec_path.to_path_buf(),
    })
}
