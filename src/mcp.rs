use std::sync::{Arc, Mutex};

use rmcp::{
    ServerHandler,
    ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult,
        Content,
        Implementation,
        ServerCapabilities,
        ServerInfo,
    },
    tool,
    tool_handler,
    tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error,
    lexical::ScoredEntry,
    retriever::{BackendKind, Retriever, RetrieverStatus},
    skills::SkillSet,
};

#[derive(Clone)]
pub struct FolioMcpServer {
    retriever: Arc<Mutex<Retriever>>,
    tool_router: ToolRouter<Self>,
}

impl FolioMcpServer {
    fn new(retriever: Retriever) -> Self {
        Self {
            retriever: Arc::new(Mutex::new(retriever)),
            tool_router: Self::tool_router(),
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Retriever>, rmcp::ErrorData> {
        self.retriever.lock().map_err(|_| {
            rmcp::ErrorData::internal_error("retriever lock poisoned", None)
        })
    }
}

#[tool_router(router = tool_router)]
impl FolioMcpServer {
    /// Find portfolio links that evidence a set of skills.
    #[tool(
        name = "folio_query_links",
        description = "Find portfolio project links that demonstrate the given skills. Skills may be a comma-separated string or a list."
    )]
    pub async fn folio_query_links(
        &self,
        params: Parameters<QueryLinksParams>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let params = params.0;
        let skills = SkillSet::from(params.skills);

        let (backend, links, ranking) = {
            let mut retriever = self.lock()?;
            let links = retriever.query_links(skills.clone());
            let ranking = params
                .explain
                .unwrap_or(false)
                .then(|| retriever.explain(skills.clone()));
            (retriever.backend(), links, ranking)
        };

        let summary = format_links_summary(&links, &skills);
        let structured = serde_json::to_value(QueryLinksResponse {
            skills: skills.terms().to_vec(),
            backend,
            link_count: links.len(),
            links,
            ranking,
        })
        .map_err(|e| mcp_error("failed to serialize links", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }

    /// Report the active backend and how many entries it holds.
    #[tool(
        name = "folio_status",
        description = "Show which retrieval backend is active and how many portfolio entries it holds."
    )]
    pub async fn folio_status(&self) -> Result<CallToolResult, rmcp::ErrorData> {
        let status = self.lock()?.status();

        let summary = format_status_summary(&status);
        let structured = serde_json::to_value(&status)
            .map_err(|e| mcp_error("failed to serialize status", e))?;

        let mut result = CallToolResult::success(vec![Content::text(summary)]);
        result.structured_content = Some(structured);
        Ok(result)
    }
}

#[tool_handler(router = self.tool_router)]
impl ServerHandler for FolioMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_server_info(
                Implementation::new("folio", env!("CARGO_PKG_VERSION")).with_title("folio MCP"),
            )
            .with_instructions(
                "Use folio_query_links with the skills a job requires to get links to portfolio projects that demonstrate them.",
            )
    }
}

/// Skills as either one comma-separated string or a list of skills.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SkillsInput {
    Text(String),
    List(Vec<String>),
}

impl From<SkillsInput> for SkillSet {
    fn from(input: SkillsInput) -> Self {
        match input {
            SkillsInput::Text(text) => SkillSet::parse(&text),
            SkillsInput::List(list) => SkillSet::from(list),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueryLinksParams {
    /// Skills to find evidence for.
    pub skills: SkillsInput,
    /// Include the lexical score of every catalogue row (default: false).
    pub explain: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryLinksResponse {
    skills: Vec<String>,
    backend: BackendKind,
    link_count: usize,
    links: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ranking: Option<Vec<ScoredEntry>>,
}

fn format_links_summary(links: &[String], skills: &SkillSet) -> String {
    let skills = skills.terms().join(", ");
    if links.is_empty() {
        return format!("No evidence found for \"{skills}\"");
    }

    let mut lines = Vec::with_capacity(links.len() + 1);
    let suffix = if links.len() == 1 { "" } else { "s" };
    lines.push(format!(
        "Found {} link{} for \"{skills}\":",
        links.len(),
        suffix
    ));
    lines.extend(links.iter().map(|l| format!("- {l}")));

    lines.join("\n")
}

fn format_status_summary(status: &RetrieverStatus) -> String {
    let entries = status
        .entries
        .map_or_else(|| "unknown".to_string(), |n| n.to_string());
    format!("Backend: {}, entries: {entries}", status.backend)
}

fn mcp_error(message: &str, error: impl std::fmt::Display) -> rmcp::ErrorData {
    rmcp::ErrorData::internal_error(
        message.to_string(),
        Some(json!({ "error": error.to_string() })),
    )
}

/// Serve the retriever over MCP on stdio until the client disconnects.
pub fn run_mcp(mut retriever: Retriever) -> error::Result<()> {
    if let Err(e) = retriever.ensure_populated() {
        tracing::warn!(error = %e, "failed to populate semantic index");
    }

    let server = FolioMcpServer::new(retriever);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            error::Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let transport = rmcp::transport::stdio();
        let running = server.serve(transport).await.map_err(|e| {
            error::Error::Config(format!(
                "MCP server initialization failed: {e}"
            ))
        })?;
        running.waiting().await.map_err(|e| {
            error::Error::Config(format!("MCP server error: {e}"))
        })?;
        Ok(())
    })
}
