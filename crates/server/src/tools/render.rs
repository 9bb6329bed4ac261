//! hairstyle_generate and hairstyle_adjust tool implementations.
//!
//! Both render an image, so both share the render cache. Keys are compound
//! fingerprints over the photos and every style parameter that changes the
//! prompt.

use hairsim_client::{AdjustRequest, Adjustments, RenderRequest, RenderedImage};
use hairsim_core::{DecodedImage, Error, Gender};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, optional_image, require_payload};
use crate::state::AppState;

/// Parameters for the hairstyle_generate tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateParams {
    /// Face photo as base64 or a data URI.
    pub face: String,
    /// Optional reference hairstyle photo.
    #[serde(default)]
    pub hairstyle: Option<String>,
    /// Preset style description.
    #[serde(default)]
    pub preset: Option<String>,
    /// Display name of the preset.
    #[serde(default)]
    pub preset_name: Option<String>,
    /// "mens" or "ladies".
    #[serde(default)]
    pub gender: Gender,
}

/// Parameters for the hairstyle_adjust tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustParams {
    /// Original face photo.
    pub face: String,
    /// The rendered image being adjusted.
    #[serde(default)]
    pub current_image: Option<String>,
    /// Preset style description the current image was rendered with.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub adjustments: Adjustments,
}

/// Output from the render tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    #[serde(flatten)]
    pub rendered: RenderedImage,
    /// Whether the result came from the cache.
    pub cache_hit: bool,
}

/// Implementation of the hairstyle_generate tool.
pub async fn generate_impl(state: &AppState, params: GenerateParams) -> Result<CallToolResult, McpError> {
    json_result(&generate(state, params).await?)
}

/// Implementation of the hairstyle_adjust tool.
pub async fn adjust_impl(state: &AppState, params: AdjustParams) -> Result<CallToolResult, McpError> {
    json_result(&adjust(state, params).await?)
}

pub(crate) async fn generate(state: &AppState, params: GenerateParams) -> Result<RenderOutput, Error> {
    let face = DecodedImage::from_payload(require_payload(&params.face, "face photo")?)?;
    let request = RenderRequest {
        face,
        reference: optional_image(params.hairstyle.as_deref())?,
        preset: params.preset,
        preset_name: params.preset_name,
        gender: params.gender,
    };
    request.validate()?;

    let key = request.cache_key();
    let studio = state.studio.clone();
    let (rendered, outcome) = state
        .renders
        .get_or_compute_keyed(key, move || async move { studio.generate(&request).await })
        .await?;

    tracing::info!(?outcome, "hairstyle render served");
    Ok(RenderOutput { rendered, cache_hit: outcome.is_cache_hit() })
}

pub(crate) async fn adjust(state: &AppState, params: AdjustParams) -> Result<RenderOutput, Error> {
    let face = DecodedImage::from_payload(require_payload(&params.face, "face photo")?)?;
    let request = AdjustRequest {
        face,
        current: optional_image(params.current_image.as_deref())?,
        preset: params.preset,
        adjustments: params.adjustments,
    };

    let key = request.cache_key();
    let studio = state.studio.clone();
    let (rendered, outcome) = state
        .renders
        .get_or_compute_keyed(key, move || async move { studio.adjust(&request).await })
        .await?;

    tracing::info!(?outcome, "hairstyle adjustment served");
    Ok(RenderOutput { rendered, cache_hit: outcome.is_cache_hit() })
}
