//! Model Context Protocol surface: newline-delimited JSON-RPC 2.0 on stdio.

pub mod protocol;
pub mod server;

pub use server::{McpServer, OS_VERSIONS_URI};
