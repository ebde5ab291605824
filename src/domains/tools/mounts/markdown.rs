//! File-backed prompt tool mount adapter.

use super::MountContext;
use super::prompt::build_text_prompt_mount;
use crate::domains::tools::mounted::MountedTool;
use crate::domains::tools::validation::ToolDescriptor;

/// Build one prompt tool whose text is read from `source`, relative to the
/// spec's directory.
pub fn build_markdown_mount(tool: &ToolDescriptor, ctx: &MountContext<'_>) -> Option<MountedTool> {
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

    let prompt_text = match std::fs::read_to_string(&source_path) {
        Ok(text) => text,
        Err(e) => {
            (ctx.log)(&format!(
                "[mcp-server] tool {} {} source unreadable: {} ({})",
                tool.name,
                tool.tool_type,
                source_path.display(),
                e
            ));
            return None;
        }
    };

    Some(build_text_prompt_mount(tool, prompt_text, source_path))
}
