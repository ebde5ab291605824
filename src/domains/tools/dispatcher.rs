//! Nested-call dispatcher.
//!
//! Script tools reach other mounted tools only through [`Dispatcher::call`].
//! The catalog behind it is written once, when the registry finishes its
//! discovery pass, and is read without locking afterwards.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::error::ToolError;
use super::mounted::{JsonObject, Runner, ToolInput};

/// Published name to runner.
pub type Catalog = HashMap<String, Runner>;

/// Default limit on nested tool calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 16;

/// Names of the tools currently executing, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStack {
    frames: Vec<String>,
}

impl CallStack {
    /// An empty stack, used for calls arriving from the host.
    pub fn root() -> Self {
        Self::default()
    }

    /// A new stack with `name` entered on top.
    pub fn enter(&self, name: &str) -> Self {
        let mut frames = self.frames.clone();
        frames.push(name.to_string());
        Self { frames }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame == name)
    }

    /// Render the chain ending in `next`, e.g. `a -> b -> a`.
    fn chain_to(&self, next: &str) -> String {
        self.frames
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(next))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Looks up mounted tools by published name and invokes them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: Arc<OnceLock<Catalog>>,
    max_depth: usize,
}

impl Dispatcher {
    /// A dispatcher whose catalog will be sealed later by the registry.
    pub(crate) fn unsealed(max_depth: usize) -> Self {
        Self {
            catalog: Arc::new(OnceLock::new()),
            max_depth: max_depth.max(1),
        }
    }

    /// Publish the finished catalog. Only the first call succeeds.
    pub(crate) fn seal(&self, catalog: Catalog) -> Result<(), ToolError> {
        self.catalog
            .set(catalog)
            .map_err(|_| ToolError::internal("tool catalog already sealed"))
    }

    pub fn is_sealed(&self) -> bool {
        self.catalog.get().is_some()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether a tool is published under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.catalog
            .get()
            .is_some_and(|catalog| catalog.contains_key(name))
    }

    /// Sorted published names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .catalog
            .get()
            .map(|catalog| catalog.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Invoke the tool published as `name` and return its result unchanged.
    ///
    /// `stack` holds the tools already executing on this call path.
    pub fn call(
        &self,
        name: &str,
        input: ToolInput,
        stack: &CallStack,
    ) -> Result<JsonObject, ToolError> {
        let runner = self
            .catalog
            .get()
            .and_then(|catalog| catalog.get(name))
            .ok_or_else(|| ToolError::unknown_tool(name))?;

        if stack.contains(name) {
            return Err(ToolError::CycleDetected {
                chain: stack.chain_to(name),
            });
        }
        if stack.depth() >= self.max_depth {
            return Err(ToolError::DepthExceeded(self.max_depth));
        }

        debug!(tool = name, depth = stack.depth(), "dispatching tool call");
        runner.call(input, stack)
    }
}
