//! Tool Mount Server Library
//!
//! This crate mounts tools declared in `TOOL.yaml` files and serves them over
//! the Model Context Protocol (MCP).
//!
//! # Architecture
//!
//! - **core**: Configuration, error handling, the MCP server and transports
//! - **domains**: Business logic organized by bounded contexts
//!   - **tools**: Spec discovery, validation, mount adapters, the mount
//!     registry and the nested-call dispatcher
//!
//! # Example
//!
//! ```rust,no_run
//! use tool_mount_server::{core::McpServer, core::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config);
//!     println!("{}", server.mount_report());
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
