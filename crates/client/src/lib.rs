//! Client code for hairsim.
//!
//! This crate provides the Gemini `generateContent` client and the hairstyle
//! operations (analysis, rendering, adjustment, preset thumbnails) shared by
//! the server and CLI.

pub mod gemini;
pub mod studio;

pub use gemini::{ContentGenerator, GeminiClient, GeminiConfig, GeminiError, GenerateRequest, GenerateResponse, ModelKind};
pub use studio::{
    AdjustRequest, Adjustments, BatchReport, FaceAnalysis, HairstyleAnalysis, PresetThumbnail, RenderRequest,
    RenderedImage, Studio, Suggestion,
};
