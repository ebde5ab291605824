//! Tool-specific error types.

use thiserror::Error;

/// Errors surfaced to the caller of a single tool call.
///
/// Mount-time problems never show up here; they are logged and the tool is
/// skipped. These variants only describe what went wrong with one call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolError {
    /// No mounted tool is published under the requested name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The call input did not have an accepted shape.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The command or script backing the tool failed to run.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A nested call re-entered a tool that is still executing.
    #[error("cycle detected: {chain}")]
    CycleDetected { chain: String },

    /// Nested calls went deeper than the configured limit.
    #[error("nested call depth exceeded (limit {0})")]
    DepthExceeded(usize),

    /// The tool execution timed out.
    #[error("tool execution timed out")]
    Timeout,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "unknown tool" error.
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::UnknownTool(name.into())
    }

    /// Create a new "invalid input" error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable kind, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidInput(_) => "invalid_input",
            Self::ExecutionFailed(_) => "execution_failed",
            Self::CycleDetected { .. } => "cycle_detected",
            Self::DepthExceeded(_) => "depth_exceeded",
            Self::Timeout => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_message() {
        let err = ToolError::unknown_tool("missing.tool");
        assert_eq!(err.to_string(), "unknown tool: missing.tool");
        assert_eq!(err.kind(), "unknown_tool");
    }

    #[test]
    fn test_cycle_message_names_chain() {
        let err = ToolError::CycleDetected {
            chain: "a -> b -> a".to_string(),
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }
}
