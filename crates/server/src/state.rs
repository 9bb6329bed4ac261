//! Shared server state.
//!
//! Built once at startup and handed to every tool call behind an `Arc`.

use std::sync::Arc;

use hairsim_client::{HairstyleAnalysis, RenderedImage, Studio};
use hairsim_core::{AppConfig, Coordinator, Error, ResultCache};

pub struct AppState {
    pub config: AppConfig,
    pub studio: Studio,
    /// Face analyses keyed by the face fingerprint.
    pub analyses: Coordinator<HairstyleAnalysis>,
    /// Rendered images keyed by compound fingerprints of the render inputs.
    pub renders: Coordinator<RenderedImage>,
}

impl AppState {
    pub fn new(config: AppConfig, studio: Studio) -> Self {
        let analyses = Coordinator::new(Arc::new(ResultCache::from_config(&config)));
        let renders = Coordinator::new(Arc::new(ResultCache::from_config(&config)));
        Self { config, studio, analyses, renders }
    }

    /// Build state with a Gemini-backed studio.
    ///
    /// Missing credentials are not an error here; model calls report them.
    pub fn from_config(config: AppConfig) -> Result<Self, Error> {
        let studio = Studio::from_config(&config)?;
        Ok(Self::new(config, studio))
    }
}
