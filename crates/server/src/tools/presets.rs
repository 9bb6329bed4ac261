//! preset_generate and preset_generate_all tool implementations.
//!
//! Admin tools that (re)build the preset thumbnails served by the frontend.
//! Thumbnails are written under `preset_output_dir` and are not cached here.

use hairsim_client::{BatchReport, PresetThumbnail};
use hairsim_core::{Error, Gender, presets};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the preset_generate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresetGenerateParams {
    /// "mens" or "ladies".
    pub gender: String,
    /// Preset id within the catalog, e.g. "bob" or "none".
    pub preset_id: String,
}

/// Output from the preset_generate tool.
#[derive(Debug, Clone, Serialize)]
pub struct PresetOutput {
    pub success: bool,
    #[serde(flatten)]
    pub thumbnail: PresetThumbnail,
}

/// Implementation of the preset_generate tool.
pub async fn preset_impl(state: &AppState, params: PresetGenerateParams) -> Result<CallToolResult, McpError> {
    json_result(&generate_preset(state, params).await?)
}

/// Implementation of the preset_generate_all tool.
pub async fn preset_all_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    json_result(&generate_all(state).await)
}

pub(crate) async fn generate_preset(state: &AppState, params: PresetGenerateParams) -> Result<PresetOutput, Error> {
    let gender: Gender = params.gender.trim().parse()?;
    let preset = presets::find(gender, params.preset_id.trim())?;

    let thumbnail = state
        .studio
        .generate_preset(gender, preset, &state.config.preset_output_dir)
        .await?;
    Ok(PresetOutput { success: true, thumbnail })
}

pub(crate) async fn generate_all(state: &AppState) -> BatchReport {
    tracing::info!(
        concurrency = state.config.preset_concurrency,
        output_dir = %state.config.preset_output_dir.display(),
        "generating all preset thumbnails"
    );
    state
        .studio
        .generate_all_presets(&state.config.preset_output_dir, state.config.preset_concurrency)
        .await
}
