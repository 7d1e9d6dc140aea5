//! Local re-encoding between the media types the pipeline handles.

use std::io::Cursor;

use image::DynamicImage;
use tracing::debug;

use crate::core::{Artifact, MediaType};
use crate::error::{FlyerError, FlyerResult};

/// Re-encode `artifact` as `target`.
///
/// Returns the input unchanged (sharing its payload) when it already has the
/// requested type. JPEG has no alpha channel, so transparency is dropped for
/// that target.
pub fn transcode(artifact: &Artifact, target: MediaType) -> FlyerResult<Artifact> {
    if artifact.media_type() == target {
        return Ok(artifact.clone());
    }
    let image = artifact.decode()?;
    let data = encode(&image, target)?;
    debug!(from = %artifact.media_type(), to = %target, bytes = data.len(), "transcoded artifact");
    Ok(Artifact::new(target, data))
}

/// Encode a decoded image as `target`.
pub fn encode(image: &DynamicImage, target: MediaType) -> FlyerResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let converted = match target {
        MediaType::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => DynamicImage::ImageRgba8(image.to_rgba8()),
    };
    converted
        .write_to(&mut out, target.image_format())
        .map_err(|e| FlyerError::encode(target.mime(), e.to_string()))?;
    Ok(out.into_inner())
}

/// PNG or JPEG input is kept as is; anything else becomes PNG.
///
/// Used before feeding a service-produced image back through upload
/// validation, which only accepts those two types.
pub fn normalize_for_upload(artifact: &Artifact) -> FlyerResult<Artifact> {
    match artifact.media_type() {
        MediaType::Png | MediaType::Jpeg => Ok(artifact.clone()),
        _ => transcode(artifact, MediaType::Png),
    }
}
