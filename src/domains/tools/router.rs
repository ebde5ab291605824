//! Tool Router - registers mounted tools with rmcp.
//!
//! [`RouterHost`] is the [`ToolHost`] behind the MCP server: every tool the
//! registry mounts becomes one dynamic route taking a single optional `input`
//! argument. Runners block, so calls are moved onto tokio's blocking pool.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, ToolRouter, cached_schema_for_type},
    model::{CallToolResult, Content, JsonObject as McpJsonObject, Meta, Tool},
};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{instrument, warn};

use super::error::ToolError;
use super::mounted::{JsonObject, LogFn, ToolInput};
use super::registry::{HostHandler, MountRegistry, ToolHost};
use crate::core::config::MountingConfig;

/// Arguments accepted by every mounted tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct MountedToolParams {
    /// Tool input: an object (e.g. `{"args": ["-la"]}`), a plain string, or omitted.
    #[serde(default)]
    pub input: Option<Value>,
}

/// Tool model advertised to clients.
pub fn mounted_tool_model(name: &str, description: &str, meta: JsonObject) -> Tool {
    Tool {
        name: name.to_string().into(),
        description: (!description.is_empty()).then(|| description.to_string().into()),
        input_schema: cached_schema_for_type::<MountedToolParams>(),
        annotations: None,
        output_schema: None,
        icons: None,
        meta: Some(Meta(meta)),
        title: None,
    }
}

/// Convert a runner outcome to an MCP result.
///
/// Runner failures, including `invalid_input` raised by a tool body or a
/// nested call, are reported in-band. Only a malformed argument shape, caught
/// before the runner starts, is a protocol error.
pub fn call_result(outcome: Result<JsonObject, ToolError>) -> CallToolResult {
    match outcome {
        Ok(result) => {
            let structured = Value::Object(result);
            CallToolResult {
                content: vec![Content::text(structured.to_string())],
                structured_content: Some(structured),
                is_error: Some(false),
                meta: None,
            }
        }
        Err(e) => {
            warn!("Tool call failed ({}): {}", e.kind(), e);
            CallToolResult::error(vec![Content::text(format!("{}: {}", e.kind(), e))])
        }
    }
}

/// Parse route arguments and run the handler on the blocking pool.
#[instrument(skip_all)]
pub async fn invoke(
    handler: HostHandler,
    arguments: Option<McpJsonObject>,
) -> Result<CallToolResult, McpError> {
    let args = arguments.unwrap_or_default();
    let params: MountedToolParams = serde_json::from_value(Value::Object(args))
        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
    let input = ToolInput::try_from(params.input)
        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

    let outcome = tokio::task::spawn_blocking(move || handler(input))
        .await
        .map_err(|e| McpError::internal_error(format!("Task failed: {:?}", e), None))?;
    Ok(call_result(outcome))
}

/// [`ToolHost`] that collects one rmcp route per mounted tool.
pub struct RouterHost<S> {
    router: ToolRouter<S>,
}

impl<S> RouterHost<S>
where
    S: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            router: ToolRouter::new(),
        }
    }

    pub fn into_router(self) -> ToolRouter<S> {
        self.router
    }
}

impl<S> Default for RouterHost<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ToolHost for RouterHost<S>
where
    S: Send + Sync + 'static,
{
    fn register(&mut self, name: &str, description: &str, meta: JsonObject, handler: HostHandler) {
        let tool = mounted_tool_model(name, description, meta);
        let route = ToolRoute::new_dyn(tool, move |ctx: ToolCallContext<'_, S>| {
            let arguments = ctx.arguments.clone();
            let handler = handler.clone();
            invoke(handler, arguments).boxed()
        });
        self.router.add_route(route);
    }
}

/// Discover tools and build the router that serves them.
pub fn build_tool_router<S>(
    settings: &MountingConfig,
    log: LogFn,
) -> (ToolRouter<S>, MountRegistry)
where
    S: Send + Sync + 'static,
{
    let mut host = RouterHost::new();
    let registry = MountRegistry::discover(settings, log, &mut host);
    (host.into_router(), registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::mounted::log_tracing;
    use crate::domains::tools::registry::GLOBAL_HINT_KEY;
    use rmcp::model::ErrorCode;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct TestServer {}

    fn object(value: Value) -> McpJsonObject {
        value.as_object().cloned().unwrap()
    }

    fn echo_handler() -> HostHandler {
        Arc::new(|input: ToolInput| Ok(input.into_payload()))
    }

    #[test]
    fn test_build_router_from_tools_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("guide");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("TOOL.yaml"),
            "name: guide\ntype: prompt\nsource: hi\ndescription: Guide\n",
        )
        .unwrap();

        let settings = MountingConfig {
            tools_dir: temp.path().to_path_buf(),
            ..MountingConfig::default()
        };
        let (router, registry): (ToolRouter<TestServer>, _) =
            build_tool_router(&settings, log_tracing());

        let tools = router.list_all();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name.as_ref(), "guide");
        assert_eq!(tools[0].description.as_deref(), Some("Guide"));
        let meta = tools[0].meta.as_ref().unwrap();
        assert!(meta.0.contains_key(GLOBAL_HINT_KEY));
        assert_eq!(registry.dispatcher().names(), vec!["guide"]);
    }

    #[test]
    fn test_input_schema_has_input_property() {
        let tool = mounted_tool_model("x", "", JsonObject::new());
        assert!(tool.description.is_none());
        let properties = tool.input_schema.get("properties").unwrap();
        assert!(properties.get("input").is_some());
    }

    #[tokio::test]
    async fn test_invoke_object_input() {
        let result = invoke(echo_handler(), Some(object(json!({"input": {"a": 1}}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(false));
        assert_eq!(result.structured_content, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_invoke_string_and_absent_input() {
        let result = invoke(echo_handler(), Some(object(json!({"input": "a b"}))))
            .await
            .unwrap();
        assert_eq!(result.structured_content, Some(json!({"input": "a b"})));

        let result = invoke(echo_handler(), None).await.unwrap();
        assert_eq!(result.structured_content, Some(json!({})));
    }

    #[tokio::test]
    async fn test_invoke_rejects_bad_input_shape() {
        let err = invoke(echo_handler(), Some(object(json!({"input": [1, 2]}))))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_call_failures_reported_in_band() {
        let result = call_result(Err(ToolError::unknown_tool("nope")));
        assert_eq!(result.is_error, Some(true));

        let result = call_result(Err(ToolError::invalid_input("args must be a list")));
        assert_eq!(result.is_error, Some(true));
        let text = serde_json::to_string(&result.content).unwrap();
        assert!(text.contains("invalid_input"));
        assert!(text.contains("args must be a list"));
    }

    #[tokio::test]
    async fn test_runner_invalid_input_is_not_a_protocol_error() {
        let handler: HostHandler =
            Arc::new(|_input: ToolInput| Err(ToolError::invalid_input("inner.tool: bad args")));
        let result = invoke(handler, Some(object(json!({"input": {"n": 1}}))))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(result.structured_content.is_none());
    }
}
