//! Directive text sent alongside each transform request.
//!
//! All directives are pure functions of their inputs so the same settings
//! always produce the same request.

use crate::config::{EnhancementSettings, OutputFormat, ResolutionTier};
use crate::core::LayerKind;

pub const RESTORATION_DIRECTIVE: &str = "\
You are an expert in professional image restoration and enhancement.
Improve and clean the provided image while keeping every original design element, including branding and artistic features.
1. Correct imperfections: find and fix noise, pixelation, compression artifacts and unwanted distortions.
2. Reconstruct details: rebuild damaged regions seamlessly using content-aware techniques.
3. Enhance clarity: improve sharpness, contrast and lighting while keeping the result natural.
4. Preserve integrity: keep the original style, color tones, composition and symmetry. Do NOT remove logos, branding or intentional artistic features.
Return a single restored image ready for professional use.";

const NO_USER_PROMPT: &str =
    "No specific changes requested, just general enhancement based on the settings.";

/// Directive asking for one semantic layer of a flyer.
pub fn extraction_directive(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Background => {
            "Create a professional, high-quality, well-lit and symmetrical background suitable for an advertising flyer. \
It must contain no text or watermarks. Render with ultra-realistic detail. \
The output must be a transparent PNG of the same dimensions as the original."
        }
        LayerKind::Person => {
            "Create a realistic central character with professional lighting. The background must be transparent. \
Keep the character centered and respect the original framing. \
If there are no people, return a completely transparent image."
        }
        LayerKind::Text => {
            "Design the main text of the flyer with clean, visible and legible typography, centered relative to the overall design. \
Do not include any brands or logos. The output must be a transparent PNG with no background."
        }
    }
}

pub fn enhancement_directive(kind: LayerKind, settings: &EnhancementSettings) -> String {
    format!(
        "Enhance this '{kind}' layer of a flyer based on the following settings.\n\
         - Model: {model}\n\
         - Resolution: {resolution}\n\
         - Image Style: {style}\n\
         - Creativity: {creativity}\n\
         - User Prompt: {prompt}\n\
         Return only the enhanced image.",
        model = settings.model,
        resolution = settings.resolution,
        style = settings.style,
        creativity = settings.creativity,
        prompt = settings.user_prompt().unwrap_or(NO_USER_PROMPT),
    )
}

pub fn export_directive(tier: ResolutionTier, format: OutputFormat) -> String {
    format!(
        "Analyze the uploaded flyer composite. Enhance its resolution using super-resolution to {tier}.\n\
         Ensure every element remains sharp, symmetrical and aligned with the original composition.\n\
         Export the final version as a high-quality, transparent {format}.\n\
         Automatically correct any artifacts, edges or halos that affect the quality of the render.\n\
         The output must be a single, high-resolution image."
    )
}

pub fn creation_directive(prompt: &str) -> String {
    format!(
        "Create a new, professional flyer based on the following description: \"{}\".\n\
         The style should be modern and clean.\n\
         The output must be a high-quality image suitable for a flyer, with a transparent background (PNG).",
        prompt.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_its_own_directive() {
        let texts: Vec<_> = LayerKind::STACKING_ORDER
            .iter()
            .map(|&k| extraction_directive(k))
            .collect();
        assert!(texts[0].contains("background"));
        assert!(texts[1].contains("character"));
        assert!(texts[2].contains("typography"));
        assert_ne!(texts[0], texts[1]);
        assert_ne!(texts[1], texts[2]);
    }

    #[test]
    fn enhancement_directive_is_deterministic() {
        let settings = EnhancementSettings {
            prompt: Some("  make it neon ".into()),
            ..EnhancementSettings::default()
        };
        let a = enhancement_directive(LayerKind::Text, &settings);
        let b = enhancement_directive(LayerKind::Text, &settings.clone());
        assert_eq!(a, b);
        assert!(a.starts_with("Enhance this 'text' layer"));
        assert!(a.contains("- Model: Classic"));
        assert!(a.contains("- User Prompt: make it neon\n"));
    }

    #[test]
    fn blank_prompt_falls_back_to_general_enhancement() {
        let settings = EnhancementSettings {
            prompt: Some(" ".into()),
            ..EnhancementSettings::default()
        };
        let text = enhancement_directive(LayerKind::Person, &settings);
        assert!(text.contains(NO_USER_PROMPT));
    }

    #[test]
    fn export_directive_names_tier_and_format() {
        let text = export_directive(ResolutionTier::Uhd8k, OutputFormat::Tiff);
        assert!(text.contains("super-resolution to 8k"));
        assert!(text.contains("transparent tiff"));
    }

    #[test]
    fn creation_directive_quotes_prompt() {
        let text = creation_directive("  jazz night, retro ");
        assert!(text.contains("description: \"jazz night, retro\""));
    }
}
