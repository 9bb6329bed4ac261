//! Hairstyle operations on top of a [`ContentGenerator`].
//!
//! The studio turns decoded photos plus style parameters into prompts, calls
//! the model, and extracts the analysis or rendered image from the response.
//! It does no caching itself; callers wrap these calls in a coordinator.

pub mod analysis;
pub mod prompt;
pub mod thumbnails;

pub use analysis::{FaceAnalysis, HairstyleAnalysis, Suggestion, parse_analysis};
pub use thumbnails::{BatchReport, PresetThumbnail};

use std::sync::Arc;

use hairsim_core::cache::{Fingerprint, fingerprint_parts};
use hairsim_core::{AppConfig, DecodedImage, Error, Gender, Preset};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::gemini::{
    ContentGenerator, GeminiClient, GeminiConfig, GeminiError, GenerateRequest, GenerateResponse, ModelKind, Part,
};
use prompt::StyleTarget;

/// A rendered hairstyle image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedImage {
    /// `data:` URI of the generated image.
    pub generated_image: String,
    /// Text the model returned alongside the image.
    pub message: String,
}

/// Inputs for rendering a new hairstyle onto a face.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub face: DecodedImage,
    pub reference: Option<DecodedImage>,
    /// Prompt fragment describing the style.
    pub preset: Option<String>,
    pub preset_name: Option<String>,
    pub gender: Gender,
}

impl RenderRequest {
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when neither a preset nor a reference image is given.
    pub fn validate(&self) -> Result<(), Error> {
        let has_preset = self.preset.as_deref().is_some_and(|p| !p.trim().is_empty());
        if !has_preset && self.reference.is_none() {
            return Err(Error::InvalidInput("select a preset or provide a reference hairstyle image".into()));
        }
        Ok(())
    }

    /// Key over every input that changes the prompt or the images sent.
    pub fn cache_key(&self) -> Fingerprint {
        let face = self.face.fingerprint();
        let reference = self.reference.as_ref().map(DecodedImage::fingerprint);
        fingerprint_parts([
            "generate",
            face.as_str(),
            reference.as_ref().map_or("", Fingerprint::as_str),
            self.preset.as_deref().unwrap_or_default(),
            self.preset_name.as_deref().unwrap_or_default(),
            self.gender.as_str(),
        ])
    }
}

/// Requested tweaks to a rendered hairstyle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Adjustments {
    /// e.g. "a little shorter".
    #[serde(default)]
    pub length: Option<String>,
    /// e.g. "ash brown".
    #[serde(default)]
    pub color: Option<String>,
    /// e.g. "more volume on top".
    #[serde(default)]
    pub style: Option<String>,
}

impl Adjustments {
    /// Non-empty fragments joined with ", ".
    pub fn summary(&self) -> String {
        [&self.length, &self.color, &self.style]
            .into_iter()
            .filter_map(|s| s.as_deref().map(str::trim).filter(|s| !s.is_empty()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Inputs for adjusting a previously rendered hairstyle.
#[derive(Debug, Clone)]
pub struct AdjustRequest {
    pub face: DecodedImage,
    pub current: Option<DecodedImage>,
    pub preset: Option<String>,
    pub adjustments: Adjustments,
}

impl AdjustRequest {
    pub fn cache_key(&self) -> Fingerprint {
        let face = self.face.fingerprint();
        let current = self.current.as_ref().map(DecodedImage::fingerprint);
        fingerprint_parts([
            "adjust".to_string(),
            face.to_string(),
            current.map(|c| c.to_string()).unwrap_or_default(),
            self.preset.clone().unwrap_or_default(),
            self.adjustments.summary(),
        ])
    }
}

/// Entry point for the hairstyle operations.
///
/// A studio without a generator still answers placeholder requests and
/// reports `Error::Configuration` for everything that needs the model.
#[derive(Clone)]
pub struct Studio {
    generator: Option<Arc<dyn ContentGenerator>>,
    unavailable: String,
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio").field("configured", &self.is_configured()).finish()
    }
}

impl Studio {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator: Some(generator), unavailable: String::new() }
    }

    /// A studio that fails model calls with the given reason.
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self { generator: None, unavailable: reason.into() }
    }

    /// Build a Gemini-backed studio, or an unconfigured one when no usable
    /// credentials are set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        match GeminiConfig::from_app(config) {
            Ok(gemini) => {
                let auth_mode = gemini.auth.mode();
                match GeminiClient::new(gemini) {
                    Ok(client) => {
                        tracing::info!(auth_mode, "generative API configured");
                        Ok(Self::new(Arc::new(client)))
                    }
                    Err(GeminiError::Credentials(reason)) => {
                        tracing::warn!(auth_mode, %reason, "generative API credentials unusable; model calls will fail");
                        Ok(Self::unconfigured(reason))
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "generative API not configured; model calls will fail");
                Ok(Self::unconfigured(e.to_string()))
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    fn generator(&self) -> Result<&Arc<dyn ContentGenerator>, Error> {
        self.generator
            .as_ref()
            .ok_or_else(|| Error::Configuration(self.unavailable.clone()))
    }

    async fn call(&self, kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, Error> {
        Ok(self.generator()?.generate(kind, request).await?)
    }

    /// Analyze the face and suggest hairstyles.
    pub async fn analyze(&self, face: &DecodedImage) -> Result<HairstyleAnalysis, Error> {
        let request = GenerateRequest::user(vec![Part::text(prompt::analysis_prompt()), Part::image(face)])
            .with_response_mime_type("application/json");

        let response = self.call(ModelKind::Analysis, request).await?;
        let text = response
            .text()
            .ok_or_else(|| Error::compute("the model returned no analysis text"))?;

        let analysis = parse_analysis(&text)?;
        tracing::info!(suggestions = analysis.suggestions.len(), "face analysis complete");
        Ok(analysis)
    }

    /// Render the face with a new hairstyle.
    pub async fn generate(&self, req: &RenderRequest) -> Result<RenderedImage, Error> {
        req.validate()?;

        let text = prompt::generate_prompt(StyleTarget {
            preset: req.preset.as_deref().filter(|p| !p.trim().is_empty()),
            preset_name: req.preset_name.as_deref(),
            gender: req.gender,
            has_reference: req.reference.is_some(),
        });

        let mut parts = vec![Part::image(&req.face)];
        if let Some(reference) = &req.reference {
            parts.push(Part::image(reference));
        }
        parts.push(Part::text(text));

        tracing::info!(preset = req.preset_name.as_deref().unwrap_or("reference image"), "rendering hairstyle");
        self.render(parts).await
    }

    /// Re-render with adjustments applied to the current result.
    pub async fn adjust(&self, req: &AdjustRequest) -> Result<RenderedImage, Error> {
        let mut parts = vec![Part::image(&req.face)];
        if let Some(current) = &req.current {
            parts.push(Part::image(current));
        }
        parts.push(Part::text(prompt::adjust_prompt(&req.adjustments.summary())));

        tracing::info!("adjusting hairstyle");
        self.render(parts).await
    }

    /// Generate the thumbnail image bytes for a preset.
    pub async fn render_thumbnail(&self, gender: Gender, preset: &Preset) -> Result<Vec<u8>, Error> {
        let request =
            GenerateRequest::user(vec![Part::text(prompt::thumbnail_prompt(gender, preset))]).with_image_output();
        let response = self.call(ModelKind::Image, request).await?;

        let image = response
            .first_image()
            .ok_or_else(|| Error::compute(format!("no thumbnail was generated for {gender}/{}", preset.id)))?;
        Ok(image.decode()?)
    }

    async fn render(&self, parts: Vec<Part>) -> Result<RenderedImage, Error> {
        let response = self
            .call(ModelKind::Image, GenerateRequest::user(parts).with_image_output())
            .await?;
        let message = response.text().unwrap_or_default();

        let Some(image) = response.first_image() else {
            let reason = if message.is_empty() { "no image was generated".to_string() } else { message };
            return Err(Error::compute(reason));
        };

        Ok(RenderedImage { generated_image: format!("data:{};base64,{}", image.mime_type, image.data), message })
    }
}
