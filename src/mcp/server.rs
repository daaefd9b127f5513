/// MCP server setup using `rmcp` with stdio transport.
///
/// Provides `McpContext` (shared state) and `McpServer` (startup logic).
use anyhow::{Context, Result};
use rmcp::{ServiceExt, transport::io::stdio};
use std::sync::Arc;
use tracing::info;

use crate::mcp::tools::AppTools;
use crate::service::QueryService;

/// Shared application context available to all tool handlers.
#[derive(Clone)]
pub struct McpContext {
    pub service: Arc<QueryService>,
}

/// MCP server wrapping the context and serving via stdio.
#[derive(Clone)]
pub struct McpServer {
    pub ctx: McpContext,
}

impl McpServer {
    pub fn new(ctx: McpContext) -> Self {
        Self { ctx }
    }

    /// Serve on stdio until the client disconnects.
    pub async fn start(self) -> Result<()> {
        info!("Starting MCP server on stdio...");

        let running = AppTools::new(self.ctx)
            .serve(stdio())
            .await
            .context("MCP server failed to initialize on stdio")?;

        let reason = running
            .waiting()
            .await
            .context("MCP server encountered an error during stdio transport")?;

        info!("MCP server stopped: {reason:?}");
        Ok(())
    }
}
