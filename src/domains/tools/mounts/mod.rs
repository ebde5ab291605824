//! Mount adapters, one per tool type.
//!
//! An adapter turns a validated descriptor into a [`MountedTool`] or logs why
//! it could not and returns `None`. Adapters never touch the host.

pub mod command;
pub mod markdown;
pub mod prompt;
pub mod script;

use std::path::Path;

use super::dispatcher::Dispatcher;
use super::mounted::{LogFn, MountedTool};
use super::validation::{ToolDescriptor, ToolType};
use crate::core::config::MountingConfig;

/// Everything an adapter may need besides the descriptor.
pub struct MountContext<'a> {
    /// The TOOL.yaml file the descriptor came from.
    pub spec_path: &'a Path,
    /// Used by script tools for nested calls.
    pub dispatcher: &'a Dispatcher,
    pub log: &'a LogFn,
    pub settings: &'a MountingConfig,
}

impl MountContext<'_> {
    /// Directory relative `source` paths resolve against.
    pub fn spec_dir(&self) -> &Path {
        self.spec_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Mount one descriptor with the adapter for its type.
pub fn mount(tool: &ToolDescriptor, ctx: &MountContext<'_>) -> Option<MountedTool> {
    match tool.tool_type {
        ToolType::Command => command::build_command_mount(tool, ctx),
        ToolType::Script => script::build_script_mount(tool, ctx),
        ToolType::StaticFileText => markdown::build_markdown_mount(tool, ctx),
        ToolType::StaticInlineText => prompt::build_prompt_mount(tool, ctx),
    }
}
