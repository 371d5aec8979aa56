// Prompt builder - turns a shoot description into synthesis instructions

use super::types::{AspectRatio, GarmentDescriptor, ShootConfig};
use serde::{Deserialize, Serialize};

/// Emitted verbatim whenever a pose reference image is attached
pub const POSE_REFERENCE_INSTRUCTION: &str = "MANDATORY: Transfer the EXACT pose, stance, and body orientation from the SECOND provided image (Pose Reference).";

pub const DEFAULT_POSE: &str = "Professional Fashion Model Pose";
pub const DEFAULT_BACKGROUND: &str = "Studio neutral background";
pub const DEFAULT_STYLE: &str = "High Fashion Photography";
pub const QUALITY_CLAUSE: &str = "QUALITY: Highly detailed, realistic lighting, 8k resolution.";

const IDENTITY_PROTOCOL: &str = "### Identity Preservation Protocol
CRITICAL:
- Face: 100% identical to the source person
- Hair: exact length, texture and color
- Skin: same tone and texture
- Body: preserved proportions";

/// Resolution tier requested from the synthesis service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageSize {
    #[serde(rename = "2K")]
    TwoK,
}

/// Image generation parameters sent alongside a prompt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisParameters {
    pub aspect_ratio: AspectRatio,

    /// Only present for high-quality shoots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
}

/// Build the full instruction text for one garment.
///
/// A pose reference always overrides the configured pose label, and a
/// non-empty `custom_text` fully replaces the garment-derived outfit clause.
pub fn build_image_prompt(
    source_image_present: bool,
    garment: &GarmentDescriptor,
    config: &ShootConfig,
    custom_text: Option<&str>,
) -> String {
    let subject = if source_image_present {
        "The person from the FIRST provided image (strictly adhere to Identity Protocol)".to_string()
    } else {
        format!("A photorealistic {} fashion model", config.gender)
    };

    let pose = if config.pose_reference.is_some() {
        POSE_REFERENCE_INSTRUCTION.to_string()
    } else {
        format!(
            "POSE: {}. Ensure a natural and professional high-fashion posture.",
            or_default(&config.pose, DEFAULT_POSE)
        )
    };

    let outfit = match custom_text.filter(|t| !t.is_empty()) {
        Some(text) => format!("USER INSTRUCTION: {}", text),
        None => garment_clause(garment),
    };

    let mut prompt = String::new();
    if source_image_present {
        prompt.push_str(IDENTITY_PROTOCOL);
        prompt.push_str("\n\n");
    }

    prompt.push_str("TASK: Fashion Photography.\n");
    prompt.push_str(&format!("SUBJECT: {}.\n", subject));
    prompt.push_str(&pose);
    prompt.push('\n');
    prompt.push_str(&format!("INSTRUCTION: {}.\n", outfit));
    prompt.push_str(&format!(
        "BACKGROUND: {}.\n",
        or_default(&config.background, DEFAULT_BACKGROUND)
    ));
    prompt.push_str(&format!(
        "STYLE: {}.\n",
        or_default(&config.photoshoot_style, DEFAULT_STYLE)
    ));
    prompt.push_str(QUALITY_CLAUSE);

    prompt
}

/// Map a shoot description to synthesis parameters
pub fn build_image_config(config: &ShootConfig) -> SynthesisParameters {
    SynthesisParameters {
        aspect_ratio: config.aspect_ratio,
        image_size: config.high_quality.then_some(ImageSize::TwoK),
    }
}

fn garment_clause(garment: &GarmentDescriptor) -> String {
    match garment.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => format!(
            "Wearing a {} ({}) typical of {}",
            garment.name, description, garment.origin
        ),
        None => format!("Wearing a {} typical of {}", garment.name, garment.origin),
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() { default } else { trimmed }
}
