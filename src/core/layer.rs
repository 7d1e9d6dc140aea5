//! Layer kinds, per-kind maps and encoded image artifacts.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::{FlyerError, FlyerResult};

/// Semantic role of an extracted layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Background,
    Person,
    Text,
}

impl LayerKind {
    /// Painter's order: backdrop behind subject behind typography.
    ///
    /// Compositing and fan-out both walk this list; nothing derives the order
    /// from a map or a set.
    pub const STACKING_ORDER: [LayerKind; 3] = [Self::Background, Self::Person, Self::Text];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Background => "background",
            Self::Person => "person",
            Self::Text => "text",
        }
    }

    /// Filename a single downloaded layer is saved under.
    pub fn download_filename(self) -> String {
        format!("{}-layer.png", self.as_str())
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = FlyerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "background" | "bg" => Ok(Self::Background),
            "person" | "subject" => Ok(Self::Person),
            "text" => Ok(Self::Text),
            other => Err(FlyerError::validation(
                "layer",
                "must be one of background, person, text",
                other,
            )),
        }
    }
}

/// One value per [`LayerKind`].
///
/// A plain struct rather than a map, so a mask or record can never be
/// missing an entry for some kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerMap<T> {
    pub background: T,
    pub person: T,
    pub text: T,
}

impl<T> LayerMap<T> {
    pub fn from_fn(mut f: impl FnMut(LayerKind) -> T) -> Self {
        Self {
            background: f(LayerKind::Background),
            person: f(LayerKind::Person),
            text: f(LayerKind::Text),
        }
    }

    pub fn get(&self, kind: LayerKind) -> &T {
        match kind {
            LayerKind::Background => &self.background,
            LayerKind::Person => &self.person,
            LayerKind::Text => &self.text,
        }
    }

    pub fn get_mut(&mut self, kind: LayerKind) -> &mut T {
        match kind {
            LayerKind::Background => &mut self.background,
            LayerKind::Person => &mut self.person,
            LayerKind::Text => &mut self.text,
        }
    }

    /// Entries in stacking order.
    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, &T)> {
        LayerKind::STACKING_ORDER
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }
}

/// Encodings the pipeline reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Png,
    Jpeg,
    Webp,
    Tiff,
}

impl MediaType {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Tiff => "tiff",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::Webp),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Webp => ImageFormat::WebP,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// An encoded raster image plus its media type.
///
/// Cloning shares the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    media_type: MediaType,
    data: Arc<Vec<u8>>,
}

impl Artifact {
    pub fn new(media_type: MediaType, data: Vec<u8>) -> Self {
        Self {
            media_type,
            data: Arc::new(data),
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode the payload using its declared media type.
    pub fn decode(&self) -> FlyerResult<DynamicImage> {
        image::load_from_memory_with_format(&self.data, self.media_type.image_format())
            .map_err(|e| FlyerError::decode(format!("{} artifact", self.media_type), e.to_string()))
    }
}
