//! service_status and cache_stats tool implementations.

use hairsim_core::{CacheStats, Coordinator};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Output from the service_status tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub status: String,
    /// Whether credentials for the generative API are present.
    pub api_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub location: String,
    /// "api_key", "vertex", "vertex_service_account" or "none".
    pub auth_mode: String,
}

/// Parameters for the cache_stats tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsParams {
    /// Drop expired entries before reporting.
    #[serde(default)]
    pub purge_expired: bool,
}

/// Statistics for one result store.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreReport {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Computations currently running for this store.
    pub in_flight: usize,
    /// Expired entries dropped by this call.
    pub purged: usize,
}

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    pub analyses: StoreReport,
    pub renders: StoreReport,
}

/// Implementation of the service_status tool.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    json_result(&status(state))
}

/// Implementation of the cache_stats tool.
pub async fn cache_stats_impl(state: &AppState, params: CacheStatsParams) -> Result<CallToolResult, McpError> {
    json_result(&cache_stats(state, &params))
}

pub(crate) fn status(state: &AppState) -> StatusOutput {
    let config = &state.config;
    let auth_mode = config.require_auth().map_or("none", |auth| auth.mode());

    StatusOutput {
        status: "ok".into(),
        api_configured: config.is_api_configured(),
        project_id: config.resolved_project_id(),
        location: config.gcp_location.clone(),
        auth_mode: auth_mode.into(),
    }
}

pub(crate) fn cache_stats(state: &AppState, params: &CacheStatsParams) -> CacheStatsOutput {
    CacheStatsOutput {
        analyses: report(&state.analyses, params.purge_expired),
        renders: report(&state.renders, params.purge_expired),
    }
}

fn report<V: Clone + Send + Sync + 'static>(coordinator: &Coordinator<V>, purge: bool) -> StoreReport {
    let purged = if purge { coordinator.store().purge_expired() } else { 0 };
    StoreReport { stats: coordinator.store().stats(), in_flight: coordinator.in_flight(), purged }
}
