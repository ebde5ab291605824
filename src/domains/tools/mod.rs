//! Tools domain module.
//!
//! Tools are not compiled in: they are declared by `TOOL.yaml` / `TOOL.yml`
//! files under the tools directory and mounted at startup.
//!
//! ## Architecture
//!
//! - `specs.rs` - Finds and parses spec files
//! - `validation.rs` - Turns raw records into tool descriptors
//! - `mounts/` - One adapter per tool type (command, script, markdown, prompt)
//! - `registry.rs` - The discovery pass, duplicate handling and host registration
//! - `dispatcher.rs` - Nested tool-to-tool calls over the sealed catalog
//! - `router.rs` - rmcp ToolRouter host for STDIO/TCP transport
//! - `error.rs` - Tool call error types
//!
//! ## Adding a New Tool
//!
//! Create a directory under the tools directory with a `TOOL.yaml`:
//!
//! ```yaml
//! name: cli.ls
//! type: command
//! command: ls
//! description: List directory contents
//! ```
//!
//! **No Rust changes and no rebuild are needed.**

pub mod dispatcher;
mod error;
pub mod mounted;
pub mod mounts;
pub mod registry;
pub mod router;
pub mod specs;
pub mod validation;

pub use dispatcher::{CallStack, Dispatcher};
pub use error::ToolError;
pub use mounted::{JsonObject, LogFn, MountedTool, Runner, ToolInput, log_tracing};
pub use registry::{MountRegistry, MountReport, ToolHost};
pub use router::{RouterHost, build_tool_router};
pub use validation::{ToolDescriptor, ToolType};
