//! Preset thumbnail generation.
//!
//! The `none` preset gets a locally drawn placeholder and is never written to
//! disk. Every other preset is rendered by the image model and saved as
//! `{output_dir}/{gender}/{id}.png`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hairsim_core::payload::encode_data_uri;
use hairsim_core::{Error, Gender, Preset, presets};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::Studio;

/// Result of generating one preset thumbnail.
#[derive(Debug, Clone, Serialize)]
pub struct PresetThumbnail {
    /// `data:` URI of the PNG.
    pub image: String,
    /// Public path of the saved file; absent for the placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub gender: Gender,
    pub preset: Preset,
}

/// Outcome of generating every preset thumbnail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    /// `gender/id` of each generated thumbnail, in catalog order.
    pub success: Vec<String>,
    /// `gender/id: reason` of each failure, in catalog order.
    pub failed: Vec<String>,
}

impl Studio {
    /// Generate (and for real presets, save) one thumbnail.
    pub async fn generate_preset(
        &self, gender: Gender, preset: &Preset, output_dir: &Path,
    ) -> Result<PresetThumbnail, Error> {
        if preset.is_placeholder() {
            let png = presets::placeholder_png()?;
            return Ok(PresetThumbnail {
                image: encode_data_uri("image/png", &png),
                path: None,
                gender,
                preset: *preset,
            });
        }

        let png = self.render_thumbnail(gender, preset).await?;

        let file = preset.file_path(output_dir, gender);
        if let Some(dir) = file.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&file, &png).await?;
        tracing::info!(path = %file.display(), "preset thumbnail saved");

        Ok(PresetThumbnail {
            image: encode_data_uri("image/png", &png),
            path: Some(preset.public_path(gender)),
            gender,
            preset: *preset,
        })
    }

    /// Generate every preset of both catalogs, at most `concurrency` at a time.
    ///
    /// Failures are collected, never short-circuit the batch.
    pub async fn generate_all_presets(&self, output_dir: &Path, concurrency: usize) -> BatchReport {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut join_set = JoinSet::new();
        let mut labels = HashMap::new();

        for (index, (gender, preset)) in presets::all().enumerate() {
            let label = format!("{gender}/{}", preset.id);
            let studio = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let output_dir: PathBuf = output_dir.to_path_buf();

            let handle = join_set.spawn(async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => studio.generate_preset(gender, preset, &output_dir).await.map(|_| ()),
                    Err(e) => Err(Error::compute_with("preset batch was cancelled", e)),
                };
                (index, result)
            });
            labels.insert(handle.id(), (index, label));
        }

        let mut outcomes: Vec<(usize, Result<String, String>)> = Vec::with_capacity(labels.len());
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((id, (index, result))) => {
                    let label = labels.get(&id).map(|(_, l)| l.clone()).unwrap_or_default();
                    outcomes.push((index, result.map(|()| label.clone()).map_err(|e| format!("{label}: {e}"))));
                }
                Err(e) => {
                    let (index, label) = labels.get(&e.id()).cloned().unwrap_or_default();
                    outcomes.push((index, Err(format!("{label}: task failed: {e}"))));
                }
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = BatchReport::default();
        for (_, outcome) in outcomes {
            match outcome {
                Ok(label) => report.success.push(label),
                Err(reason) => {
                    tracing::warn!(%reason, "preset thumbnail failed");
                    report.failed.push(reason);
                }
            }
        }

        tracing::info!(succeeded = report.success.len(), failed = report.failed.len(), "preset batch complete");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::studio::testing::{IMAGE_RESPONSE_JSON, ScriptedGenerator};

    #[tokio::test]
    async fn test_placeholder_needs_no_generator() {
        let dir = tempfile::tempdir().unwrap();
        let studio = Studio::unconfigured("not configured");
        let none = presets::find(Gender::Mens, presets::NONE_ID).unwrap();

        let thumb = studio.generate_preset(Gender::Mens, none, dir.path()).await.unwrap();
        assert!(thumb.image.starts_with("data:image/png;base64,"));
        assert!(thumb.path.is_none());
        assert!(!dir.path().join("mens").exists());
    }

    #[tokio::test]
    async fn test_generated_preset_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(ScriptedGenerator::with_json(&[IMAGE_RESPONSE_JSON]));
        let studio = Studio::new(generator.clone());
        let bob = presets::find(Gender::Ladies, "bob").unwrap();

        let thumb = studio.generate_preset(Gender::Ladies, bob, dir.path()).await.unwrap();
        assert_eq!(thumb.path.as_deref(), Some("/images/presets/ladies/bob.png"));

        let saved = std::fs::read(dir.path().join("ladies").join("bob.png")).unwrap();
        assert_eq!(saved[..4], [0x89, b'P', b'N', b'G']);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_real_preset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let studio = Studio::unconfigured("set HAIRSIM_GEMINI_API_KEY");
        let wolf = presets::find(Gender::Mens, "wolf").unwrap();

        let err = studio.generate_preset(Gender::Mens, wolf, dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn test_generate_all_reports_in_catalog_order() {
        let dir = tempfile::tempdir().unwrap();
        // 14 real presets; only 13 scripted responses, so exactly one fails.
        let generator = Arc::new(ScriptedGenerator::with_json(&[IMAGE_RESPONSE_JSON; 13]));
        let studio = Studio::new(generator.clone());

        let report = studio.generate_all_presets(dir.path(), 2).await;

        assert_eq!(report.success.len() + report.failed.len(), 16);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].contains("COMPUTE_FAILED"));
        assert_eq!(report.success[0], "mens/none");
        assert!(report.success.contains(&"ladies/none".to_string()));
        assert_eq!(generator.calls(), 14);
    }

    #[tokio::test]
    async fn test_generate_all_unconfigured_only_placeholders_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let studio = Studio::unconfigured("not configured");

        let report = studio.generate_all_presets(dir.path(), 4).await;
        assert_eq!(report.success, vec!["mens/none".to_string(), "ladies/none".to_string()]);
        assert_eq!(report.failed.len(), 14);
        assert!(report.failed.iter().all(|f| f.contains("CONFIG_ERROR")));
    }
}
