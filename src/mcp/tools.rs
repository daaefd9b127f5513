/// MCP tool handlers for the Griptape documentation server.
///
/// Six read-only tools, each a thin wrapper over [`QueryService`]:
/// 1. search_docs           – ranked page search over framework and/or nodes docs
/// 2. get_page              – full page by URL or title
/// 3. search_griptape_nodes – ranked node search with optional category filter
/// 4. get_node_details      – full node record by id or name
/// 5. list_categories       – framework sections and node categories with counts
/// 6. get_code_examples     – code examples about a topic
///
/// [`QueryService`]: crate::service::QueryService
use rmcp::handler::server::ServerHandler;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{
    ErrorData as McpError, handler::server::tool::ToolRouter, model::*, tool, tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::catalog::Scope;
use crate::error::{QueryError, QueryResult};
use crate::mcp::server::McpContext;

const SERVER_INSTRUCTIONS: &str = "Read-only access to the Griptape Framework documentation and the \
Griptape Nodes catalog. Use search_docs for general questions, search_griptape_nodes to find nodes, \
get_page or get_node_details to read a result in full, list_categories to browse, and \
get_code_examples for runnable snippets.";

// ── Parameter structs ────────────────────────────────────────────────

#[derive(Deserialize, JsonSchema)]
struct SearchDocsParams {
    /// Search query (natural language or keywords)
    query: String,
    /// Which docs to search: framework | nodes | all (default: all)
    #[serde(default, alias = "source")]
    scope: Option<String>,
    /// Max results, 1-50 (default: 10)
    limit: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct GetPageParams {
    /// Page URL (https://...) or page title
    url_or_title: String,
}

#[derive(Deserialize, JsonSchema)]
struct SearchNodesParams {
    /// Search query (node name, capability, keyword)
    query: String,
    /// Node category filter, e.g. Image, Agents, 3D (all if omitted)
    category: Option<String>,
    /// Max results, 1-50 (default: 20)
    limit: Option<i64>,
}

#[derive(Deserialize, JsonSchema)]
struct NodeDetailsParams {
    /// Node name (e.g. 'LoadImage') or numeric node id
    node_name: String,
}

#[derive(Deserialize, JsonSchema)]
struct CodeExamplesParams {
    /// Topic to find code for (e.g. 'prompt driver', 'agent memory')
    topic: String,
    /// Max results, 1-50 (default: 10)
    limit: Option<i64>,
}

// ── Response helpers ─────────────────────────────────────────────────

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

fn error_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(
        serde_json::to_string_pretty(&value).unwrap_or_default(),
    )]))
}

/// Payload for errors the caller can act on.
fn error_payload(err: &QueryError) -> serde_json::Value {
    let message = match err {
        QueryError::InvalidInput(m)
        | QueryError::NotFound(m)
        | QueryError::StoreUnavailable(m)
        | QueryError::Internal(m) => m.as_str(),
    };
    serde_json::json!({ "error": err.kind(), "message": message })
}

/// Turn a service outcome into a tool result. Caller mistakes become error
/// results; storage failures become protocol errors.
fn respond<T, F>(tool: &str, outcome: QueryResult<T>, wrap: F) -> Result<CallToolResult, McpError>
where
    F: FnOnce(T) -> serde_json::Value,
{
    match outcome {
        Ok(value) => json_result(wrap(value)),
        Err(err @ (QueryError::InvalidInput(_) | QueryError::NotFound(_))) => {
            error_result(error_payload(&err))
        }
        Err(err) => {
            warn!("{tool} failed: {err}");
            Err(McpError::internal_error(err.to_string(), None))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

// ── Tool implementations ─────────────────────────────────────────────

#[derive(Clone)]
pub struct AppTools {
    pub ctx: McpContext,
    pub tool_router: ToolRouter<Self>,
}

#[tool_handler]
impl ServerHandler for AppTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[tool_router]
impl AppTools {
    pub fn new(ctx: McpContext) -> Self {
        Self {
            ctx,
            tool_router: Self::tool_router(),
        }
    }

    // ── Tool 1: search_docs ─────────────────────────────────────────

    #[tool(
        description = "Search Griptape documentation. Scope 'framework' searches the Griptape Framework docs, 'nodes' the Griptape Nodes docs, 'all' both. Returns ranked pages with title, URL, snippet and score."
    )]
    async fn search_docs(
        &self,
        params: Parameters<SearchDocsParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let outcome = Scope::parse(p.scope.as_deref().unwrap_or_default())
            .and_then(|scope| self.ctx.service.search_docs(&p.query, scope, p.limit));

        respond("search_docs", outcome, |hits| {
            serde_json::json!({
                "query": p.query,
                "count": hits.len(),
                "results": to_json(&hits),
            })
        })
    }

    // ── Tool 2: get_page ────────────────────────────────────────────

    #[tool(
        description = "Get the full content of a documentation page by URL or title, including its sections and code examples."
    )]
    async fn get_page(&self, params: Parameters<GetPageParams>) -> Result<CallToolResult, McpError> {
        let outcome = self.ctx.service.get_page(&params.0.url_or_title);
        respond("get_page", outcome, |page| to_json(&page))
    }

    // ── Tool 3: search_griptape_nodes ───────────────────────────────

    #[tool(
        description = "Search the Griptape Nodes catalog by name, capability or keyword, optionally within one category (e.g. Image, Agents, Text, 3D)."
    )]
    async fn search_griptape_nodes(
        &self,
        params: Parameters<SearchNodesParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let outcome = self
            .ctx
            .service
            .search_nodes(&p.query, p.category.as_deref(), p.limit);

        respond("search_griptape_nodes", outcome, |nodes| {
            serde_json::json!({
                "query": p.query,
                "count": nodes.len(),
                "nodes": to_json(&nodes),
            })
        })
    }

    // ── Tool 4: get_node_details ────────────────────────────────────

    #[tool(
        description = "Get full details of a Griptape node by name or id: description, category, documentation, sections and code examples."
    )]
    async fn get_node_details(
        &self,
        params: Parameters<NodeDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self.ctx.service.get_node_details(&params.0.node_name);
        respond("get_node_details", outcome, |node| to_json(&node))
    }

    // ── Tool 5: list_categories ─────────────────────────────────────

    #[tool(
        description = "List framework documentation sections and Griptape Nodes categories with their counts."
    )]
    async fn list_categories(&self) -> Result<CallToolResult, McpError> {
        let outcome = self.ctx.service.list_categories();
        respond("list_categories", outcome, |cats| to_json(&cats))
    }

    // ── Tool 6: get_code_examples ───────────────────────────────────

    #[tool(
        description = "Find code examples about a topic across the framework and nodes docs. Each example includes its language, code, caption and the page it comes from."
    )]
    async fn get_code_examples(
        &self,
        params: Parameters<CodeExamplesParams>,
    ) -> Result<CallToolResult, McpError> {
        let p = params.0;
        let outcome = self.ctx.service.get_code_examples(&p.topic, p.limit);

        respond("get_code_examples", outcome, |examples| {
            serde_json::json!({
                "topic": p.topic,
                "count": examples.len(),
                "examples": to_json(&examples),
            })
        })
    }
}
