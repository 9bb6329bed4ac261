//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    analyze::{AnalyzeParams, analyze_impl},
    presets::{PresetGenerateParams, preset_all_impl, preset_impl},
    render::{AdjustParams, GenerateParams, adjust_impl, generate_impl},
    status::{CacheStatsParams, cache_stats_impl, status_impl},
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for mcp-hairsim.
#[derive(Clone)]
pub struct HairsimServer {
    tool_router: ToolRouter<Self>,
    state: Arc<AppState>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl HairsimServer {
    /// Create a new server handler.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    #[tool(
        description = "Analyze a face photo (base64 or data URI) and suggest hairstyles with a salon order. Results are cached per photo."
    )]
    async fn hairstyle_analyze(&self, params: Parameters<AnalyzeParams>) -> Result<CallToolResult, McpError> {
        analyze_impl(&self.state, params.0).await
    }

    /// Render a new hairstyle onto the face.
    ///
    /// Needs either a preset description or a reference hairstyle photo.
    #[tool(
        description = "Render a new hairstyle onto a face photo from a preset description or a reference hairstyle photo. Returns the image as a data URI."
    )]
    async fn hairstyle_generate(&self, params: Parameters<GenerateParams>) -> Result<CallToolResult, McpError> {
        generate_impl(&self.state, params.0).await
    }

    #[tool(description = "Re-render a hairstyle with length, color or style adjustments. Returns the image as a data URI.")]
    async fn hairstyle_adjust(&self, params: Parameters<AdjustParams>) -> Result<CallToolResult, McpError> {
        adjust_impl(&self.state, params.0).await
    }

    #[tool(description = "Generate and save the thumbnail for one preset (gender: mens|ladies).")]
    async fn preset_generate(&self, params: Parameters<PresetGenerateParams>) -> Result<CallToolResult, McpError> {
        preset_impl(&self.state, params.0).await
    }

    #[tool(description = "Generate and save thumbnails for every preset. Reports successes and failures.")]
    async fn preset_generate_all(&self) -> Result<CallToolResult, McpError> {
        preset_all_impl(&self.state).await
    }

    #[tool(description = "Report whether the generative API is configured and which credentials are in use.")]
    async fn service_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    #[tool(description = "Report result cache statistics, optionally purging expired entries first.")]
    async fn cache_stats(&self, params: Parameters<CacheStatsParams>) -> Result<CallToolResult, McpError> {
        cache_stats_impl(&self.state, params.0).await
    }
}

impl ServerHandler for HairsimServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-hairsim".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
