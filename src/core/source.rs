//! Source images and the upload boundary.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use image::ImageReader;
use tracing::debug;

use crate::core::layer::{Artifact, MediaType};
use crate::error::{FlyerError, FlyerResult};

/// Largest upload accepted, in bytes (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Declared media types accepted at the upload boundary.
pub const ACCEPTED_UPLOAD_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Longest side accepted for a source image, in pixels.
pub const MAX_SOURCE_SIDE: u32 = 16_384;

/// Largest pixel count accepted for a source image. The compositor allocates
/// an RGBA8 canvas of the source size, so this bounds it to 256 MiB.
pub const MAX_SOURCE_PIXELS: u64 = 64 * 1024 * 1024;

/// Provenance tag: identifies one source image for the lifetime of a session.
///
/// Ids increase monotonically; a request tagged with an id other than the
/// active one belongs to a replaced source and its result is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub(crate) u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// A raw file handed in from outside, before validation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Media type as declared by the sender, e.g. `image/png`.
    pub media_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    /// Wrap an in-memory artifact as if it had been uploaded.
    pub fn from_artifact(name: impl Into<String>, artifact: &Artifact) -> Self {
        Self::new(name, artifact.media_type().mime(), artifact.bytes().to_vec())
    }

    /// Read a file from disk, declaring its media type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream` and will
    /// be rejected by [`validate_upload`].
    pub async fn read(path: impl AsRef<Path>) -> FlyerResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            FlyerError::io("read upload", e).with_path(path.display().to_string())
        })?;
        let media_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(MediaType::from_extension)
            .map(MediaType::mime)
            .unwrap_or("application/octet-stream");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, media_type, data))
    }
}

/// An upload that passed validation, with its pixel dimensions.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub name: String,
    pub artifact: Artifact,
    pub width: u32,
    pub height: u32,
}

/// The image every layer in a session is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub id: SourceId,
    pub name: String,
    pub artifact: Artifact,
    pub width: u32,
    pub height: u32,
}

/// Check type, size and header of an upload. Makes no remote calls.
///
/// Only the image header is read to learn the dimensions; pixel data is not
/// decoded here.
pub fn validate_upload(file: &UploadedFile) -> FlyerResult<ValidatedUpload> {
    let declared = file.media_type.trim().to_ascii_lowercase();
    let media_type = ACCEPTED_UPLOAD_TYPES
        .contains(&declared.as_str())
        .then(|| MediaType::from_mime(&declared))
        .flatten()
        .ok_or_else(|| {
            FlyerError::validation(
                "upload.media_type",
                "must be image/jpeg or image/png",
                file.media_type.clone(),
            )
            .with_user_message("Invalid file type. Please upload a JPG or PNG image.")
        })?;

    if file.data.len() > MAX_UPLOAD_BYTES {
        return Err(FlyerError::validation(
            "upload.size",
            format!("must be at most {} bytes", MAX_UPLOAD_BYTES),
            file.data.len().to_string(),
        )
        .with_user_message("File is too large. Please upload an image under 5MB."));
    }

    let (width, height) =
        ImageReader::with_format(Cursor::new(&file.data), media_type.image_format())
            .into_dimensions()
            .map_err(|e| {
                FlyerError::validation("upload.data", "must be a readable image", e.to_string())
                    .with_user_message("The uploaded file could not be read as an image.")
            })?;

    check_dimensions(width, height)?;

    debug!(name = %file.name, %media_type, width, height, bytes = file.data.len(), "upload accepted");

    Ok(ValidatedUpload {
        name: file.name.clone(),
        artifact: Artifact::new(media_type, file.data.clone()),
        width,
        height,
    })
}

/// Reject empty sources and sources too large to composite.
pub fn check_dimensions(width: u32, height: u32) -> FlyerResult<()> {
    let found = format!("{width}x{height}");
    if width == 0 || height == 0 {
        return Err(FlyerError::validation("upload.dimensions", "must be non-zero", found));
    }
    if width.max(height) > MAX_SOURCE_SIDE
        || u64::from(width) * u64::from(height) > MAX_SOURCE_PIXELS
    {
        return Err(FlyerError::validation(
            "upload.dimensions",
            format!("must be at most {MAX_SOURCE_SIDE}px per side and {MAX_SOURCE_PIXELS} pixels"),
            found,
        )
        .with_user_message("Image dimensions are too large. Please upload a smaller image."));
    }
    Ok(())
}
