//! hairstyle_analyze tool implementation.
//!
//! Analyzes a face photo and suggests hairstyles. Results are cached by the
//! fingerprint of the decoded photo, so re-sending the same image (with or
//! without a data URI header) never triggers a second model call.

use hairsim_client::HairstyleAnalysis;
use hairsim_core::DecodedImage;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{json_result, require_payload};
use crate::state::AppState;

/// Parameters for the hairstyle_analyze tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeParams {
    /// Face photo as base64 or a `data:image/...;base64,` URI.
    pub face: String,
}

/// Output from the hairstyle_analyze tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeOutput {
    #[serde(flatten)]
    pub analysis: HairstyleAnalysis,
    /// Stable id derived from the photo fingerprint.
    pub analysis_id: String,
    /// Whether the result came from the cache.
    pub cache_hit: bool,
}

/// Implementation of the hairstyle_analyze tool.
pub async fn analyze_impl(state: &AppState, params: AnalyzeParams) -> Result<CallToolResult, McpError> {
    json_result(&analyze(state, params).await?)
}

pub(crate) async fn analyze(state: &AppState, params: AnalyzeParams) -> Result<AnalyzeOutput, hairsim_core::Error> {
    let face = DecodedImage::from_payload(require_payload(&params.face, "face photo")?)?;
    let key = face.fingerprint();
    let analysis_id = format!("hairstyle_{}", key.short());

    let studio = state.studio.clone();
    let (analysis, outcome) = state
        .analyses
        .get_or_compute_keyed(key, move || async move { studio.analyze(&face).await })
        .await?;

    tracing::info!(%analysis_id, ?outcome, "hairstyle analysis served");
    Ok(AnalyzeOutput { analysis, analysis_id, cache_hit: outcome.is_cache_hit() })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hairsim_client::GeminiError;
    use hairsim_core::Error;

    use super::*;
    use crate::state::testing::*;

    fn params(face: String) -> AnalyzeParams {
        AnalyzeParams { face }
    }

    #[tokio::test]
    async fn test_analyze_caches_by_photo() {
        let generator = Arc::new(StubGenerator::always(ANALYSIS_RESPONSE_JSON));
        let state = state_with(generator.clone());
        let raw = encode(JPEG_BYTES);

        let first = analyze(&state, params(raw.clone())).await.unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.analysis.suggestions[0].name, "Bob");
        assert!(first.analysis_id.starts_with("hairstyle_"));
        assert_eq!(first.analysis_id.len(), "hairstyle_".len() + 32);

        let second = analyze(&state, params(format!("data:image/jpeg;base64,{raw}"))).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.analysis_id, first.analysis_id);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_analyze_requires_face() {
        let generator = Arc::new(StubGenerator::always(ANALYSIS_RESPONSE_JSON));
        let state = state_with(generator.clone());

        let err = analyze(&state, params("   ".into())).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = analyze(&state, params("not base64!".into())).await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_analyze_failure_is_not_cached() {
        let generator = Arc::new(StubGenerator::always(ANALYSIS_RESPONSE_JSON));
        generator.push_error(GeminiError::Timeout);
        let state = state_with(generator.clone());
        let raw = encode(PNG_BYTES);

        let err = analyze(&state, params(raw.clone())).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamTimeout(_)));

        let ok = analyze(&state, params(raw)).await.unwrap();
        assert!(!ok.cache_hit);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_analyze_impl_returns_camel_case_json() {
        let generator = Arc::new(StubGenerator::always(ANALYSIS_RESPONSE_JSON));
        let state = state_with(generator);

        let result = analyze_impl(&state, params(encode(JPEG_BYTES))).await.unwrap();
        let text = serde_json::to_string(&result.content).unwrap();
        assert!(text.contains("analysisId"));
        assert!(text.contains("faceAnalysis"));
        assert!(text.contains("cacheHit"));
    }
}
