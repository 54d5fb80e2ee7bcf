//! MCP server implementation for recipevault.
//!
//! Exposes the recipe store as MCP tools for AI editors.

use std::borrow::Cow;
use std::fmt::Write;
use std::sync::Arc;

use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorCode, ErrorData as McpError, ServerCapabilities, ServerInfo,
    },
    schemars, tool, tool_handler, tool_router,
    transport::stdio,
};
use serde::Deserialize;

use crate::commands::{Vault, VaultError};
use crate::search::SearchResult;

/// Parameters for `list_recipes` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    #[schemars(description = "Directory relative to the recipe root (default: root)")]
    pub path: Option<String>,
}

/// Parameters for `read_recipe` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ReadParams {
    #[schemars(description = "Recipe path (e.g., 'desserts/cake.md')")]
    pub path: String,
}

/// Parameters for `save_recipe` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveParams {
    #[schemars(description = "Recipe path (e.g., 'desserts/cake.md')")]
    pub path: String,
    #[schemars(description = "Full recipe content (markdown)")]
    pub content: String,
    #[schemars(
        description = "Version returned by read_recipe; the save fails if the recipe changed since"
    )]
    pub expected_version: Option<u64>,
}

/// Parameters for `search_recipes` and `find_recipes` tools.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "The search query")]
    pub query: String,
    #[schemars(description = "Maximum number of results")]
    pub limit: Option<usize>,
}

/// MCP server exposing recipevault tools.
#[derive(Clone)]
pub struct RecipeVaultServer {
    vault: Arc<Vault>,
    tool_router: ToolRouter<Self>,
}

fn tool_error(action: &str, e: &VaultError) -> McpError {
    McpError {
        code: if e.is_client_error() {
            ErrorCode::INVALID_PARAMS
        } else {
            ErrorCode::INTERNAL_ERROR
        },
        message: Cow::from(format!("{action} failed: {e}")),
        data: None,
    }
}

fn format_results(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No matches found for '{query}'");
    }

    let mut output = String::new();
    for result in results {
        let _ = write!(
            output,
            "## {}\n**File:** {}\n**Score:** {}\n",
            result.title, result.path, result.score
        );
        if let Some(preview) = &result.preview {
            let _ = writeln!(output, "{preview}");
        }
        output.push('\n');
    }
    let _ = write!(output, "*{} result(s) found*", results.len());
    output
}

#[tool_router]
impl RecipeVaultServer {
    #[must_use]
    pub fn new(vault: Arc<Vault>) -> Self {
        Self {
            vault,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "List recipes and folders in a directory")]
    async fn list_recipes(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        let entries = self
            .vault
            .list_directory(params.path.as_deref().unwrap_or_default())
            .map_err(|e| tool_error("List", &e))?;

        if entries.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No recipes found.".to_string(),
            )]));
        }

        let mut output = String::new();
        for entry in &entries {
            if entry.is_dir() {
                let _ = writeln!(output, "- {}/", entry.path);
            } else {
                let _ = writeln!(output, "- {}", entry.path);
            }
        }
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(description = "Read a recipe together with its current version")]
    async fn read_recipe(
        &self,
        Parameters(params): Parameters<ReadParams>,
    ) -> Result<CallToolResult, McpError> {
        let document = self
            .vault
            .read_document(&params.path)
            .map_err(|e| tool_error("Read", &e))?;

        let output = format!(
            "**Path:** {}\n**Version:** {}\n\n{}",
            document.path, document.version, document.content
        );
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        description = "Save a recipe. Pass the version from read_recipe to avoid overwriting someone else's edit"
    )]
    async fn save_recipe(
        &self,
        Parameters(params): Parameters<SaveParams>,
    ) -> Result<CallToolResult, McpError> {
        let version = self
            .vault
            .write_document(&params.path, &params.content, params.expected_version)
            .map_err(|e| tool_error("Save", &e))?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Saved {} (version {version})",
            params.path
        ))]))
    }

    #[tool(description = "Search recipe contents, best matches first")]
    async fn search_recipes(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let results = self.vault.search_content(&params.query, params.limit);
        Ok(CallToolResult::success(vec![Content::text(
            format_results(&params.query, &results),
        )]))
    }

    #[tool(description = "Find recipe files by name")]
    async fn find_recipes(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let results = self.vault.search_filenames(&params.query, params.limit);
        Ok(CallToolResult::success(vec![Content::text(
            format_results(&params.query, &results),
        )]))
    }
}

#[tool_handler]
impl ServerHandler for RecipeVaultServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "recipevault stores markdown recipes. Use list_recipes to browse, \
                search_recipes and find_recipes to locate recipes, read_recipe to get \
                a recipe and its version, and save_recipe to store edits."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Start the MCP server with stdio transport.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a fatal error.
pub async fn serve(vault: Vault) -> anyhow::Result<()> {
    let server = RecipeVaultServer::new(Arc::new(vault));
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, preview: Option<&str>) -> SearchResult {
        SearchResult {
            path: path.to_string(),
            title: "Cake".to_string(),
            score: 12,
            matches: vec![],
            preview: preview.map(str::to_string),
        }
    }

    #[test]
    fn formats_empty_results() {
        assert_eq!(format_results("pie", &[]), "No matches found for 'pie'");
    }

    #[test]
    fn formats_results_with_previews() {
        let output = format_results(
            "cake",
            &[result("cake.md", Some("chocolate cake")), result("b.md", None)],
        );
        assert!(output.contains("**File:** cake.md"));
        assert!(output.contains("chocolate cake\n"));
        assert!(output.ends_with("*2 result(s) found*"));
    }

    #[test]
    fn client_errors_map_to_invalid_params() {
        let err = VaultError::Storage(crate::storage::StorageError::NotFound("x".into()));
        assert_eq!(tool_error("Read", &err).code.0, ErrorCode::INVALID_PARAMS.0);
    }
}
