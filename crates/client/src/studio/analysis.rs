//! Face analysis result types and parsing.

use std::sync::LazyLock;

use hairsim_core::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches a fenced code block, optionally tagged `json`.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("fence regex is valid"));

/// Face analysis and ranked hairstyle suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HairstyleAnalysis {
    pub face_analysis: FaceAnalysis,
    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
    #[serde(default)]
    pub salon_order: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaceAnalysis {
    #[serde(default)]
    pub face_shape: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub current_hair: String,
    #[serde(default)]
    pub skin_tone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    #[serde(default)]
    pub rank: u32,
    pub name: String,
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub why_good: String,
    #[serde(default)]
    pub styling: String,
    #[serde(default)]
    pub bangs: String,
    #[serde(default)]
    pub color: String,
    /// 0-100.
    #[serde(default)]
    pub match_score: Option<f64>,
}

/// Strip a surrounding ```json fence if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    match FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => text.trim(),
    }
}

/// Parse the model's analysis text.
///
/// Suggestions come back sorted by rank.
///
/// # Errors
///
/// Returns a compute error if the text is not the expected JSON.
pub fn parse_analysis(text: &str) -> Result<HairstyleAnalysis, Error> {
    let json = strip_code_fence(text);
    let mut analysis: HairstyleAnalysis = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(error = %e, response = %text, "analysis response is not valid JSON");
        Error::compute_with("could not parse the analysis returned by the model", e)
    })?;

    analysis.suggestions.sort_by_key(|s| s.rank);
    Ok(analysis)
}
