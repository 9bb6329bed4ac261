//! Prompt construction for the hairstyle operations.

use hairsim_core::{Gender, Preset};

const FACE_RULES: &str = "Instructions:
- Keep the facial features (eyes, nose, mouth, skin) exactly as they are
- Change only the hairstyle
- Make the result look natural
- Generate exactly one image";

/// Prompt asking for a face analysis and five hairstyle suggestions as JSON.
pub fn analysis_prompt() -> &'static str {
    r#"Analyze this face photo and suggest five hairstyles that would suit this person.

Return the following information as JSON:

{
  "faceAnalysis": {
    "faceShape": "face shape (one of: oval, round, square, inverted triangle, long, base)",
    "features": "facial features (eyes, nose, contour, forehead width, ...)",
    "currentHair": "description of the current hairstyle",
    "skinTone": "skin tone"
  },
  "suggestions": [
    {
      "rank": 1,
      "name": "hairstyle name (e.g. short bob)",
      "length": "short/medium/long",
      "description": "detailed description of the hairstyle",
      "whyGood": "why it suits this face shape",
      "styling": "how to style it",
      "bangs": "recommended bangs (with/without/see-through, ...)",
      "color": "recommended color",
      "matchScore": 95
    }
  ],
  "salonOrder": "how to order the best-matching hairstyle at a salon"
}

Return exactly five suggestions, ranked 1 to 5. Return JSON only."#
}

/// What the render should be based on.
#[derive(Debug, Clone, Copy)]
pub struct StyleTarget<'a> {
    pub preset: Option<&'a str>,
    pub preset_name: Option<&'a str>,
    pub gender: Gender,
    pub has_reference: bool,
}

/// Prompt for rendering the face with a new hairstyle.
///
/// Three variants: preset with a reference image, reference image only,
/// preset only.
pub fn generate_prompt(target: StyleTarget<'_>) -> String {
    let name = target.preset_name.unwrap_or("Custom");
    match (target.preset, target.has_reference) {
        (Some(preset), true) => format!(
            "Change the hairstyle of the person in this face photo.

Hairstyle: {name} ({preset})
The second image is a reference for the overall look.

{FACE_RULES}"
        ),
        (None, _) => "The first image is a face photo of a person. The second image is a hairstyle reference.
Generate an image of the first person with their hairstyle changed to match the look of the second image.
Do not copy it exactly; aim for a similar style.
Keep the facial features as they are and change only the hairstyle.
Make the result look natural."
            .to_string(),
        (Some(preset), false) => format!(
            "Change the hairstyle of the person in this face photo.

Hairstyle: {name}
Details: {preset}
Category: {}

{FACE_RULES}",
            target.gender.label()
        ),
    }
}

/// Prompt for tweaking an already rendered hairstyle.
pub fn adjust_prompt(adjustments: &str) -> String {
    format!(
        "The first image is a face photo of a person; the second image shows their current hairstyle.

Starting from the current hairstyle, generate an image with the following adjustments:
{adjustments}

Instructions:
- Keep the facial features exactly as they are
- Apply only the requested adjustments
- Make the result look natural
- Generate exactly one image"
    )
}

/// Prompt for a preset button thumbnail.
pub fn thumbnail_prompt(gender: Gender, preset: &Preset) -> String {
    format!(
        "Generate a hairstyle sample image for a mobile app preset button.

Requirements:
- Show ONLY the hairstyle on a simple mannequin head silhouette
- Pure white background (#FFFFFF)
- Front-facing view, slightly angled
- {}'s hairstyle
- Hairstyle: {} - {}
- Natural hair color (dark brown or black)
- Clean, professional look suitable for a beauty app
- The image should be square, suitable for a small thumbnail (72x72px display)
- Focus on the hair shape and style, not facial features
- Minimal, modern aesthetic

Style reference: Beauty app preset thumbnails",
        gender.subject(),
        preset.name,
        preset.prompt.unwrap_or_default()
    )
}
