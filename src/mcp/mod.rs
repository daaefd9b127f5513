//! MCP adapter: tool router and stdio server.
pub mod server;
pub mod tools;
