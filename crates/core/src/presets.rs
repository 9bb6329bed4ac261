//! Hairstyle preset catalog.
//!
//! Presets are fixed, grouped by [`Gender`]. Each gender has a `none` entry
//! with no prompt whose thumbnail is drawn locally instead of generated.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Id of the "no change" preset present in every catalog.
pub const NONE_ID: &str = "none";

/// Side length of preset thumbnails in pixels (2x the 72px display size).
pub const THUMBNAIL_SIZE: u32 = 144;

const BACKGROUND: Rgb<u8> = Rgb([0xF5, 0xF5, 0xF5]);
const STROKE: Rgb<u8> = Rgb([0xCC, 0xCC, 0xCC]);

/// Catalog a preset belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Mens,
    Ladies,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Mens, Gender::Ladies];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Mens => "mens",
            Gender::Ladies => "ladies",
        }
    }

    /// Noun used in prompts ("man's hairstyle").
    pub fn subject(self) -> &'static str {
        match self {
            Gender::Mens => "man",
            Gender::Ladies => "woman",
        }
    }

    /// Catalog label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            Gender::Mens => "men's",
            Gender::Ladies => "ladies'",
        }
    }

    pub fn presets(self) -> &'static [Preset] {
        match self {
            Gender::Mens => MENS,
            Gender::Ladies => LADIES,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mens" => Ok(Gender::Mens),
            "ladies" => Ok(Gender::Ladies),
            other => Err(Error::InvalidInput(format!("unknown gender '{other}' (expected 'mens' or 'ladies')"))),
        }
    }
}

/// A named hairstyle with the prompt fragment describing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub name: &'static str,
    /// `None` only for the placeholder preset.
    pub prompt: Option<&'static str>,
}

impl Preset {
    const fn new(id: &'static str, name: &'static str, prompt: &'static str) -> Self {
        Self { id, name, prompt: Some(prompt) }
    }

    const fn none() -> Self {
        Self { id: NONE_ID, name: "None", prompt: None }
    }

    pub fn is_placeholder(&self) -> bool {
        self.prompt.is_none()
    }

    /// URL path the frontend loads the thumbnail from.
    pub fn public_path(&self, gender: Gender) -> String {
        format!("/images/presets/{gender}/{}.png", self.id)
    }

    /// Location of the thumbnail under `root`.
    pub fn file_path(&self, root: &Path, gender: Gender) -> PathBuf {
        root.join(gender.as_str()).join(format!("{}.png", self.id))
    }
}

static MENS: &[Preset] = &[
    Preset::none(),
    Preset::new("short", "Short", "Clean short cut, tidy sides, light movement on top"),
    Preset::new("twoblock", "Two-block", "Two-block cut with clipped sides, longer top swept to one side"),
    Preset::new("mash", "Mash", "Rounded mushroom cut, heavy fringe, soft impression"),
    Preset::new("center", "Center part", "Center-parted hair framing the face, Korean style"),
    Preset::new("wolf", "Wolf", "Wolf cut, longer at the nape, many layers, lots of movement"),
    Preset::new("perm", "Perm", "Loose perm, natural waves, effortless look"),
    Preset::new("long", "Long", "Shoulder-length natural straight hair, clean look"),
];

static LADIES: &[Preset] = &[
    Preset::none(),
    Preset::new("short", "Short", "Short cut showing the ears, neat silhouette, feminine"),
    Preset::new("bob", "Bob", "Bob ending below the chin, curled under, neat and elegant"),
    Preset::new("lob", "Lob", "Shoulder-length long bob, flipped-out ends, effortless look"),
    Preset::new("medium", "Medium", "Collarbone-length medium cut with layers, natural"),
    Preset::new("layer", "Layered", "Heavily layered style with movement, light around the face"),
    Preset::new("long", "Long", "Long hair past the chest, glossy straight, elegant"),
    Preset::new("wave", "Wave", "Soft loose waves, curled hair, glamorous impression"),
];

/// Find a preset by id.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the catalog has no such id.
pub fn find(gender: Gender, id: &str) -> Result<&'static Preset, Error> {
    gender
        .presets()
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| Error::InvalidInput(format!("unknown {gender} preset '{id}'")))
}

/// Every (gender, preset) pair, men's first.
pub fn all() -> impl Iterator<Item = (Gender, &'static Preset)> {
    Gender::ALL.into_iter().flat_map(|g| g.presets().iter().map(move |p| (g, p)))
}

/// Draw the thumbnail for the `none` preset: a grey "no" sign on a light
/// background, encoded as PNG.
pub fn placeholder_png() -> Result<Vec<u8>, Error> {
    const CENTER: f32 = 72.0;
    const RADIUS: f32 = 50.0;
    const WIDTH: f32 = 2.0;

    let img = RgbImage::from_fn(THUMBNAIL_SIZE, THUMBNAIL_SIZE, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let dist = ((fx - CENTER).powi(2) + (fy - CENTER).powi(2)).sqrt();
        let on_circle = dist <= RADIUS && dist > RADIUS - WIDTH;
        let on_slash = (40..=104).contains(&x) && (40..=104).contains(&y) && x.abs_diff(y) < WIDTH as u32;

        if on_circle || on_slash { STROKE } else { BACKGROUND }
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| Error::compute_with("failed to encode placeholder thumbnail", e))?;
    Ok(buf.into_inner())
}
