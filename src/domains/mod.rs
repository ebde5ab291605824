//! Domains module containing business logic organized by bounded contexts.
//!
//! The only domain is `tools`: discovering tool specs on disk and mounting
//! them as callable MCP tools.

pub mod tools;
