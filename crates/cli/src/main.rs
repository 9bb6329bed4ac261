//! hairsim command-line interface.
//!
//! ```bash
//! # Print content fingerprints (the cache keys) of photos
//! hairsim fingerprint face.jpg other.png
//!
//! # Analyze photos; repeated photos are served from the cache
//! hairsim analyze face.jpg face-copy.jpg
//!
//! # Regenerate every preset thumbnail
//! hairsim presets --output ./frontend/images/presets --concurrency 4
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hairsim_client::{HairstyleAnalysis, Studio};
use hairsim_core::{AppConfig, Coordinator, DecodedImage, Gender, ResultCache, presets};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Hairstyle simulation tools
#[derive(Parser, Debug)]
#[command(name = "hairsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the content fingerprint of each photo
    Fingerprint {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Analyze face photos and suggest hairstyles
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Generate preset thumbnails
    Presets {
        /// Output directory (defaults to preset_output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Thumbnails generated at once (defaults to preset_concurrency)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Only this catalog (mens or ladies)
        #[arg(long, requires = "preset")]
        gender: Option<Gender>,

        /// Only this preset id
        #[arg(long, requires = "gender")]
        preset: Option<String>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeReport {
    path: PathBuf,
    analysis_id: String,
    cache_hit: bool,
    #[serde(flatten)]
    analysis: HairstyleAnalysis,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Fingerprint { paths } => run_fingerprint(&paths).await,
        Commands::Analyze { paths } => run_analyze(&config, &paths).await,
        Commands::Presets { output, concurrency, gender, preset } => {
            let output = output.unwrap_or_else(|| config.preset_output_dir.clone());
            let concurrency = concurrency.unwrap_or(config.preset_concurrency);
            run_presets(&config, &output, concurrency, gender.zip(preset)).await
        }
    }
}

async fn read_image(path: &Path) -> Result<DecodedImage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    DecodedImage::from_bytes(bytes).with_context(|| format!("{} is not an image", path.display()))
}

async fn run_fingerprint(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let image = read_image(path).await?;
        println!("{}  {}  {}", image.fingerprint(), image.mime_type(), path.display());
    }
    Ok(())
}

async fn run_analyze(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let studio = Studio::from_config(config)?;
    let analyses = Coordinator::new(Arc::new(ResultCache::from_config(config)));

    let mut reports = Vec::with_capacity(paths.len());
    for path in paths {
        let image = read_image(path).await?;
        let analysis_id = format!("hairstyle_{}", image.fingerprint().short());
        let payload = image.to_base64();
        let studio = studio.clone();

        let (analysis, outcome) = analyses
            .get_or_compute(&payload, move |face| async move { studio.analyze(&face).await })
            .await
            .with_context(|| format!("analysis of {} failed", path.display()))?;

        reports.push(AnalyzeReport { path: path.clone(), analysis_id, cache_hit: outcome.is_cache_hit(), analysis });
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

async fn run_presets(
    config: &AppConfig, output: &Path, concurrency: usize, only: Option<(Gender, String)>,
) -> Result<()> {
    let studio = Studio::from_config(config)?;

    if let Some((gender, id)) = only {
        let preset = presets::find(gender, &id)?;
        let thumbnail = studio.generate_preset(gender, preset, output).await?;
        println!("{}", thumbnail.path.as_deref().unwrap_or("placeholder (not saved)"));
        return Ok(());
    }

    let report = studio.generate_all_presets(output, concurrency).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.failed.is_empty() {
        anyhow::bail!("{} of {} presets failed", report.failed.len(), report.failed.len() + report.success.len());
    }
    Ok(())
}
