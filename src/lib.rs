//! # griptape-docs-mcp, Griptape documentation MCP server
//!
//! Read-only query service over a pre-built SQLite store of the Griptape
//! Framework docs and the Griptape Nodes catalog, served to AI assistants via
//! the Model Context Protocol (MCP).
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading, validation, and store path resolution
//! - **[`catalog`]**: Sources, search scopes, node categories, framework sections
//! - **[`db`]**: SQLite + FTS5 document store (read path and build-time writer)
//! - **[`search`]**: Ranker interface and its FTS5 `bm25()` implementation
//! - **[`service`]**: The six query operations behind the tools
//! - **[`mcp`]**: MCP server with 6 tool handlers (stdio transport via rmcp)
//! - **[`ingest`]**: Offline store build from local markdown trees
//! - **[`validate`]**: Post-build store checks

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod mcp;
pub mod search;
pub mod service;
pub mod validate;
