//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler. Creating the server runs the
//! tool discovery pass; the resulting ToolRouter serves STDIO/TCP clients and
//! the mount registry serves HTTP calls.
//!
//! **Adding a new tool does NOT require modifying this file!** Drop a
//! `TOOL.yaml` under the tools directory and restart.

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::config::Config;
use crate::domains::tools::router::{MountedToolParams, call_result};
use crate::domains::tools::{
    LogFn, MountRegistry, MountReport, ToolInput, build_tool_router, log_tracing,
};

/// Instructions reported to clients on initialize.
pub const SERVER_INSTRUCTIONS: &str = "Tools on this server are mounted from TOOL.yaml specs. \
     Every tool takes one optional `input` argument: an object or a plain string.";

/// The main MCP server handler.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Mounted tools and the nested-call catalog.
    registry: Arc<MountRegistry>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server, mounting tools from `config.mounting`.
    pub fn new(config: Config) -> Self {
        Self::with_log(config, log_tracing())
    }

    /// Create a server whose mount diagnostics go to `log`.
    pub fn with_log(config: Config, log: LogFn) -> Self {
        let config = Arc::new(config);
        let (tool_router, registry) = build_tool_router::<Self>(&config.mounting, log);

        Self {
            tool_router,
            registry: Arc::new(registry),
            config,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Summary of the startup discovery pass.
    pub fn mount_report(&self) -> &MountReport {
        self.registry.report()
    }

    pub fn registry(&self) -> &Arc<MountRegistry> {
        &self.registry
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all mounted tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<Value> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema,
                    "_meta": t.meta
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    ///
    /// `arguments` has the same shape as over STDIO: `{"input": ...}`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, String> {
        if !self.registry.dispatcher().contains(name) {
            warn!("Unknown tool requested: {}", name);
            return Err(format!("Unknown tool: {}", name));
        }

        let params: MountedToolParams = match arguments {
            Value::Null => MountedToolParams::default(),
            other => serde_json::from_value(other).map_err(|e| e.to_string())?,
        };
        let input = ToolInput::try_from(params.input).map_err(|e| e.to_string())?;

        let registry = self.registry.clone();
        let tool = name.to_string();
        let outcome = tokio::task::spawn_blocking(move || registry.call(&tool, input))
            .await
            .map_err(|e| format!("Task failed: {:?}", e))?;

        serde_json::to_value(call_result(outcome)).map_err(|e| e.to_string())
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
