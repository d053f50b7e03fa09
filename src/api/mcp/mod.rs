//! Tool-call surface: MCP over line-delimited JSON-RPC.

pub mod protocol;
pub mod server;
pub mod stdio;
pub mod tools;

pub use self::{server::McpServer, stdio::StdioTransport};
