//! Spec loader: finds and parses `TOOL.yaml` / `TOOL.yml` files.
//!
//! Discovery order is the lexicographic order of resolved absolute paths so
//! duplicate-name tie breaks are reproducible. A file that cannot be read or
//! parsed is logged and skipped; it never aborts the pass.

use ignore::WalkBuilder;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::mounted::{JsonObject, LogFn};

/// File names recognized as tool specs.
pub const SPEC_FILE_NAMES: [&str; 2] = ["TOOL.yaml", "TOOL.yml"];

/// Directory segment whose specs are skipped unless explicitly included.
pub const TEMPLATES_SEGMENT: &str = "templates";

/// Discover all spec file paths under `tools_dir` in deterministic order.
pub fn spec_paths(tools_dir: &Path, include_templates: bool) -> Vec<PathBuf> {
    if !tools_dir.exists() {
        debug!("Tools directory does not exist: {}", tools_dir.display());
        return Vec::new();
    }
    let root = tools_dir
        .canonicalize()
        .unwrap_or_else(|_| tools_dir.to_path_buf());

    // Hidden and git-ignored directories are still tool directories.
    let walker = WalkBuilder::new(&root).standard_filters(false).build();

    let mut resolved = BTreeSet::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let is_spec = entry
            .file_name()
            .to_str()
            .is_some_and(|name| SPEC_FILE_NAMES.contains(&name));
        if !is_spec {
            continue;
        }
        let path = entry
            .path()
            .canonicalize()
            .unwrap_or_else(|_| entry.path().to_path_buf());
        resolved.insert(path);
    }

    resolved
        .into_iter()
        .filter(|path| include_templates || !in_templates_dir(&root, path))
        .collect()
}

/// Whether `path` sits below a `templates` directory inside `root`.
fn in_templates_dir(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .any(|c| matches!(c, Component::Normal(segment) if segment == TEMPLATES_SEGMENT))
}

/// Read and parse one spec file.
///
/// Returns `None` for empty files (silently) and for unreadable, unparsable
/// or non-mapping files (after logging one line).
pub fn parse_tool_spec(tool_path: &Path, log: &LogFn) -> Option<JsonObject> {
    let text = match std::fs::read_to_string(tool_path) {
        Ok(text) => text,
        Err(e) => {
            log(&format!(
                "[mcp-server] tool spec read failed: {} ({})",
                tool_path.display(),
                e
            ));
            return None;
        }
    };
    if text.trim().is_empty() {
        return None;
    }

    let parsed: serde_yaml::Value = match serde_yaml::from_str(&text) {
        Ok(value) => value,
        Err(e) => {
            log(&format!(
                "[mcp-server] tool spec parse failed: {} ({})",
                tool_path.display(),
                e
            ));
            return None;
        }
    };
    if !parsed.is_mapping() {
        log(&format!(
            "[mcp-server] tool spec parse failed: {} (top-level YAML must be an object)",
            tool_path.display()
        ));
        return None;
    }

    match serde_json::to_value(&parsed) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            log(&format!(
                "[mcp-server] tool spec parse failed: {} ({})",
                tool_path.display(),
                e
            ));
            None
        }
    }
}
