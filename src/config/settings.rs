//! # Operation Settings
//!
//! Settings bundles passed into enhancement and export. Every type parses from
//! the short strings the CLI accepts and (de)serializes with serde, so a
//! settings file and a command line describe the same thing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use flyer_compose::ResolutionTier;

use crate::core::MediaType;
use crate::error::FlyerError;

/// Knobs for re-enhancing a single layer.
///
/// Field values are free text forwarded into the directive; defaults match the
/// enhancement panel's initial selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementSettings {
    pub model: String,
    pub resolution: String,
    pub style: String,
    pub creativity: String,
    /// Optional free-text instruction. Blank is treated as absent.
    pub prompt: Option<String>,
}

impl Default for EnhancementSettings {
    fn default() -> Self {
        Self {
            model: "Classic".to_string(),
            resolution: "2k".to_string(),
            style: "Estándar".to_string(),
            creativity: "Nada".to_string(),
            prompt: None,
        }
    }
}

impl EnhancementSettings {
    /// The user prompt, if it has any non-whitespace content.
    pub fn user_prompt(&self) -> Option<&str> {
        self.prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Final export encodings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Tiff,
    Png,
}

impl OutputFormat {
    pub fn media_type(self) -> MediaType {
        match self {
            Self::Webp => MediaType::Webp,
            Self::Tiff => MediaType::Tiff,
            Self::Png => MediaType::Png,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Tiff => "tiff",
            Self::Png => "png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = FlyerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webp" => Ok(Self::Webp),
            "tiff" | "tif" => Ok(Self::Tiff),
            "png" => Ok(Self::Png),
            other => Err(FlyerError::validation(
                "format",
                "must be one of webp, tiff, png",
                other,
            )),
        }
    }
}

/// What sits underneath the layers when compositing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackgroundSpec {
    #[default]
    Transparent,
    White,
    Black,
    /// Solid RGB color.
    Custom([u8; 3]),
}

impl BackgroundSpec {
    /// Opaque fill color, or `None` for a transparent background.
    pub fn fill_rgba(self) -> Option<[u8; 4]> {
        match self {
            Self::Transparent => None,
            Self::White => Some([255, 255, 255, 255]),
            Self::Black => Some([0, 0, 0, 255]),
            Self::Custom([r, g, b]) => Some([r, g, b, 255]),
        }
    }
}

impl fmt::Display for BackgroundSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transparent => f.write_str("transparent"),
            Self::White => f.write_str("white"),
            Self::Black => f.write_str("black"),
            Self::Custom([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
        }
    }
}

impl FromStr for BackgroundSpec {
    type Err = FlyerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "transparent" | "none" => return Ok(Self::Transparent),
            "white" => return Ok(Self::White),
            "black" => return Ok(Self::Black),
            _ => {}
        }
        let hex = value.strip_prefix('#').unwrap_or(&value);
        let invalid = || {
            FlyerError::validation(
                "background",
                "must be transparent, white, black or a #rrggbb color",
                s,
            )
        };
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::Custom([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for BackgroundSpec {
    type Error = FlyerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackgroundSpec> for String {
    fn from(value: BackgroundSpec) -> Self {
        value.to_string()
    }
}

/// Everything the export step needs besides the pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: OutputFormat,
    pub resolution: ResolutionTier,
    pub background: BackgroundSpec,
}

impl ExportSettings {
    /// `flyer-rebuilt-<tier>.<ext>`
    pub fn filename(&self) -> String {
        format!(
            "flyer-rebuilt-{}.{}",
            self.resolution.label(),
            self.format.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_defaults_and_filename() {
        let settings = ExportSettings::default();
        assert_eq!(settings.format, OutputFormat::Webp);
        assert_eq!(settings.resolution, ResolutionTier::Uhd4k);
        assert_eq!(settings.background, BackgroundSpec::Transparent);
        assert_eq!(settings.filename(), "flyer-rebuilt-4k.webp");

        let settings = ExportSettings {
            format: OutputFormat::Tiff,
            resolution: ResolutionTier::Hd1080,
            background: BackgroundSpec::White,
        };
        assert_eq!(settings.filename(), "flyer-rebuilt-1080p.tiff");
    }

    #[test]
    fn background_parsing() {
        assert_eq!("White".parse::<BackgroundSpec>().unwrap(), BackgroundSpec::White);
        assert_eq!(
            "#FF8000".parse::<BackgroundSpec>().unwrap(),
            BackgroundSpec::Custom([255, 128, 0])
        );
        assert_eq!(
            "00ff00".parse::<BackgroundSpec>().unwrap(),
            BackgroundSpec::Custom([0, 255, 0])
        );
        assert!("#12345".parse::<BackgroundSpec>().is_err());
        assert!("#gg0000".parse::<BackgroundSpec>().is_err());
        assert_eq!(BackgroundSpec::Transparent.fill_rgba(), None);
        assert_eq!(
            BackgroundSpec::Custom([1, 2, 3]).fill_rgba(),
            Some([1, 2, 3, 255])
        );
    }

    #[test]
    fn settings_deserialize_from_json() {
        let settings: ExportSettings = serde_json::from_str(
            r##"{"format":"png","resolution":"8k","background":"#102030"}"##,
        )
        .unwrap();
        assert_eq!(settings.format, OutputFormat::Png);
        assert_eq!(settings.resolution, ResolutionTier::Uhd8k);
        assert_eq!(settings.background, BackgroundSpec::Custom([16, 32, 48]));

        let enhance: EnhancementSettings =
            serde_json::from_str(r#"{"style":"Cómic","prompt":"   "}"#).unwrap();
        assert_eq!(enhance.model, "Classic");
        assert_eq!(enhance.style, "Cómic");
        assert_eq!(enhance.user_prompt(), None);
    }

    #[test]
    fn background_serializes_as_string() {
        let json = serde_json::to_string(&BackgroundSpec::Custom([255, 0, 16])).unwrap();
        assert_eq!(json, "\"#ff0010\"");
    }
}
