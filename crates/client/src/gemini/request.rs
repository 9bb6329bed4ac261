//! Gemini `generateContent` request types.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hairsim_core::DecodedImage;
use serde::{Deserialize, Serialize};

use super::GeminiError;

/// Body of a `generateContent` call.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One conversation turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text or inline-data part. Exactly one field is set on requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    /// Set by thinking models on reasoning parts; never sent.
    #[serde(default, skip_serializing)]
    pub thought: Option<bool>,
}

/// Base64 payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Output kinds the model may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Image,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<Modality>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    pub fn image(image: &DecodedImage) -> Self {
        Self::inline(image.mime_type(), image.bytes())
    }

    pub fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            inline_data: Some(InlineData { mime_type: mime_type.to_string(), data: STANDARD.encode(bytes) }),
            ..Default::default()
        }
    }
}

impl InlineData {
    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>, GeminiError> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|e| GeminiError::Parse(format!("inline data is not valid base64: {e}")))
    }
}

impl GenerateRequest {
    /// Single user turn with the given parts.
    pub fn user(parts: Vec<Part>) -> Self {
        Self { contents: vec![Content { role: Some("user".into()), parts }], generation_config: None }
    }

    /// Ask for text and image output, as image models require.
    pub fn with_image_output(mut self) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .response_modalities = Some(vec![Modality::Text, Modality::Image]);
        self
    }

    /// Constrain the text output to the given MIME type (e.g. `application/json`).
    pub fn with_response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.generation_config
            .get_or_insert_with(GenerationConfig::default)
            .response_mime_type = Some(mime_type.into());
        self
    }

    /// Reject requests the API would refuse anyway.
    pub fn validate(&self) -> Result<(), GeminiError> {
        if self.contents.iter().all(|c| c.parts.is_empty()) {
            return Err(GeminiError::InvalidRequest("request has no parts".into()));
        }

        for part in self.contents.iter().flat_map(|c| &c.parts) {
            match (&part.text, &part.inline_data) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(GeminiError::InvalidRequest(
                        "each part must carry exactly one of text or inline data".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}
