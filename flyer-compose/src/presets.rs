// SPDX-License-Identifier: MIT
//! # Output Sizes and Resolution Tiers
//!
//! The compositor always paints at the source image's natural size. The
//! resolution tier only matters for the export step, where it names the
//! super-resolution target and ends up in the exported filename.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Represents a 2D size with width and height in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Number of bytes an RGBA8 buffer of this size occupies.
    pub fn rgba_len(&self) -> usize {
        (self.w as usize) * (self.h as usize) * 4
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// Export resolution tiers offered for the final super-resolution pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionTier {
    #[serde(rename = "1080p")]
    Hd1080,
    #[default]
    #[serde(rename = "4k")]
    Uhd4k,
    #[serde(rename = "8k")]
    Uhd8k,
}

impl ResolutionTier {
    pub const ALL: [ResolutionTier; 3] = [Self::Hd1080, Self::Uhd4k, Self::Uhd8k];

    /// Label used in directives and in exported filenames.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hd1080 => "1080p",
            Self::Uhd4k => "4k",
            Self::Uhd8k => "8k",
        }
    }
}

impl fmt::Display for ResolutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResolutionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1080p" | "hd" => Ok(Self::Hd1080),
            "4k" => Ok(Self::Uhd4k),
            "8k" => Ok(Self::Uhd8k),
            other => Err(format!(
                "Invalid resolution tier: {}. Use: {}",
                other,
                Self::ALL.map(Self::label).join(", ")
            )),
        }
    }
}
