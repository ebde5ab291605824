//! Mount registry - the single discovery pass that fills the tool catalog.
//!
//! For each discovered spec the registry validates it, resolves its published
//! name, hands it to the matching mount adapter and then registers the result
//! with the host and the nested-call catalog together. Every problem along the
//! way is logged once and the spec is skipped; the pass always completes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::dispatcher::{CallStack, Catalog, Dispatcher};
use super::error::ToolError;
use super::mounted::{JsonObject, LogFn, MountedTool, Runner, ToolInput};
use super::mounts::{MountContext, mount};
use super::specs::{parse_tool_spec, spec_paths};
use super::validation::{SpecRejection, scalar_text, validate_tool_spec};
use crate::core::config::MountingConfig;

/// Metadata key holding [`GLOBAL_TOOL_HINT`]; tool metadata cannot replace it.
pub const GLOBAL_HINT_KEY: &str = "tool_usage_hint";

/// Usage hint attached to every registered tool: the `~` shorthand.
pub const GLOBAL_TOOL_HINT: &str = "If a user prefixes text with '~', interpret that as an explicit \
     request to use MCP tools. Treat the token after '~' as a partial tool reference, search \
     available tool names/descriptions for the best match, then call the canonical tool name.";

/// Host-side entry point of a mounted tool.
pub type HostHandler = Arc<dyn Fn(ToolInput) -> Result<JsonObject, ToolError> + Send + Sync>;

/// The registration capability the registry needs from a host server.
pub trait ToolHost {
    fn register(&mut self, name: &str, description: &str, meta: JsonObject, handler: HostHandler);
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
    /// Spec files found under the tools directory.
    pub declared: usize,
    /// Published names, in mount order.
    pub mounted: Vec<String>,
    pub skipped: usize,
}

impl fmt::Display for MountReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tool(s) mounted from {} spec(s), {} skipped",
            self.mounted.len(),
            self.declared,
            self.skipped
        )
    }
}

/// Mounted tools and the sealed catalog behind them.
#[derive(Debug, Clone)]
pub struct MountRegistry {
    dispatcher: Dispatcher,
    report: MountReport,
}

/// Metadata registered with the host: the tool's own keys plus the global hint.
pub fn merged_meta(tool_meta: &JsonObject) -> JsonObject {
    let mut meta = tool_meta.clone();
    if meta.contains_key(GLOBAL_HINT_KEY) {
        debug!("tool metadata key {} ignored", GLOBAL_HINT_KEY);
    }
    meta.insert(
        GLOBAL_HINT_KEY.to_string(),
        serde_json::Value::String(GLOBAL_TOOL_HINT.to_string()),
    );
    meta
}

/// Log one validation rejection.
fn log_rejection(log: &LogFn, raw: &JsonObject, path: &Path, rejection: SpecRejection) {
    let name = raw
        .get("name")
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    let line = match rejection {
        SpecRejection::MissingName => {
            format!("[mcp-server] tool invalid ({}): {}", rejection, path.display())
        }
        SpecRejection::MissingType => format!(
            "[mcp-server] tool {} invalid ({}): {}",
            name,
            rejection,
            path.display()
        ),
        SpecRejection::UnsupportedType => {
            let tool_type = raw
                .get("type")
                .and_then(scalar_text)
                .map(|s| s.trim().to_lowercase())
                .unwrap_or_default();
            format!(
                "[mcp-server] tool {} skipped ({}): no mount for tool type {} at {}",
                name,
                rejection,
                tool_type,
                path.display()
            )
        }
    };
    log(&line);
}

/// Wrap a runner so each call records the tool on the call stack.
fn entering(name: &str, runner: Runner) -> Runner {
    let name = name.to_string();
    Runner::new(move |input, stack| runner.call(input, &stack.enter(&name)))
}

impl MountRegistry {
    /// Run one discovery pass over `settings.tools_dir`, registering every
    /// mountable tool with `host`.
    pub fn discover(settings: &MountingConfig, log: LogFn, host: &mut dyn ToolHost) -> Self {
        let dispatcher = Dispatcher::unsealed(settings.max_call_depth);
        let paths = spec_paths(&settings.tools_dir, settings.include_templates);
        info!(
            "Discovering tools in {} ({} spec file(s))",
            settings.tools_dir.display(),
            paths.len()
        );

        let mut report = MountReport {
            declared: paths.len(),
            ..MountReport::default()
        };
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();
        let mut catalog = Catalog::new();

        for path in paths {
            let Some(raw) = parse_tool_spec(&path, &log) else {
                continue;
            };
            let descriptor = match validate_tool_spec(&raw) {
                Ok(descriptor) => descriptor,
                Err(rejection) => {
                    log_rejection(&log, &raw, &path, rejection);
                    continue;
                }
            };

            let published = descriptor.published_name();
            if let Some(existing) = claimed.get(&published) {
                log(&format!(
                    "[mcp-server] tool {} skipped: duplicate published name at {} (already defined at {})",
                    published,
                    path.display(),
                    existing.display()
                ));
                continue;
            }
            claimed.insert(published.clone(), path.clone());

            let ctx = MountContext {
                spec_path: &path,
                dispatcher: &dispatcher,
                log: &log,
                settings,
            };
            let Some(mounted) = mount(&descriptor, &ctx) else {
                continue;
            };

            if catalog.contains_key(&mounted.name) {
                log(&format!(
                    "[mcp-server] tool {} skipped: duplicate mounted name at {}",
                    mounted.name,
                    path.display()
                ));
                continue;
            }

            Self::register(host, &mut catalog, &mounted);
            debug!(
                tool = %mounted.name,
                tool_type = %descriptor.tool_type,
                source = %mounted.source_path.display(),
                "mounted tool"
            );
            report.mounted.push(mounted.name);
        }

        report.skipped = report.declared.saturating_sub(report.mounted.len());
        if let Err(e) = dispatcher.seal(catalog) {
            warn!("Tool catalog not sealed: {}", e);
        }
        info!("{}", report);

        Self { dispatcher, report }
    }

    /// Register with the host and insert into the catalog in one step.
    fn register(host: &mut dyn ToolHost, catalog: &mut Catalog, mounted: &MountedTool) {
        let runner = entering(&mounted.name, mounted.runner.clone());
        let host_runner = runner.clone();
        let handler: HostHandler = Arc::new(move |input: ToolInput| {
            host_runner.call(input.or_empty_object(), &CallStack::root())
        });

        host.register(
            &mounted.name,
            &mounted.description,
            merged_meta(&mounted.meta),
            handler,
        );
        catalog.insert(mounted.name.clone(), runner);
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn report(&self) -> &MountReport {
        &self.report
    }

    /// Call a mounted tool as the host would.
    pub fn call(&self, name: &str, input: ToolInput) -> Result<JsonObject, ToolError> {
        self.dispatcher
            .call(name, input.or_empty_object(), &CallStack::root())
    }
}
