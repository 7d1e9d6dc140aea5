//! Flattening visible layers into one raster.
//!
//! The output canvas always has the source image's natural dimensions. Every
//! drawn layer is stretched to exactly that size (no aspect preservation) and
//! blended source-over in [`LayerKind::STACKING_ORDER`].

use fast_image_resize::Resizer;
use flyer_compose::{Canvas, ComposeError, Size};
use tracing::{debug, warn};

use crate::config::BackgroundSpec;
use crate::core::{Artifact, LayerKind, LayerMap, MAX_SOURCE_PIXELS, MediaType, VisibilityMask};
use crate::error::{FlyerError, FlyerResult};

/// A flattened flyer and which layers ended up in it.
#[derive(Debug, Clone)]
pub struct Flattened {
    /// Lossless PNG of the composite.
    pub artifact: Artifact,
    /// Kinds actually drawn, bottom to top.
    pub drawn: Vec<LayerKind>,
    pub width: u32,
    pub height: u32,
}

/// Composite the visible, present layers over `background`.
///
/// A layer that is hidden or absent is skipped. A layer whose bytes cannot be
/// decoded is logged and skipped; it never aborts the composite.
pub fn composite(
    layers: &LayerMap<Option<Artifact>>,
    mask: &VisibilityMask,
    width: u32,
    height: u32,
    background: BackgroundSpec,
) -> FlyerResult<Flattened> {
    let size = Size { w: width, h: height };
    if size.is_empty() {
        return Err(FlyerError::validation(
            "composite.dimensions",
            "must be non-zero",
            size.to_string(),
        ));
    }
    if u64::from(width) * u64::from(height) > MAX_SOURCE_PIXELS {
        return Err(FlyerError::validation(
            "composite.dimensions",
            format!("must be at most {MAX_SOURCE_PIXELS} pixels"),
            size.to_string(),
        ));
    }

    let mut canvas = Canvas::new(size);
    if let Some(color) = background.fill_rgba() {
        canvas.fill(color);
    }

    let mut resizer = Resizer::new();
    let mut drawn = Vec::with_capacity(LayerKind::STACKING_ORDER.len());
    for (kind, artifact) in layers.iter() {
        let Some(artifact) = artifact else { continue };
        if !mask.is_visible(kind) {
            continue;
        }
        let layer = match artifact.decode() {
            Ok(image) => image.to_rgba8(),
            Err(e) => {
                warn!(layer = %kind, error = %e, "skipping undecodable layer");
                continue;
            }
        };
        canvas
            .draw_stretched(&mut resizer, &layer)
            .map_err(|e| compose_error(e).with_metadata("layer", kind.as_str()))?;
        drawn.push(kind);
    }

    let png = canvas.encode_png().map_err(compose_error)?;
    debug!(%size, %background, layers = ?drawn, bytes = png.len(), "composited flyer");

    Ok(Flattened {
        artifact: Artifact::new(MediaType::Png, png),
        drawn,
        width,
        height,
    })
}

fn compose_error(error: ComposeError) -> FlyerError {
    match error {
        ComposeError::Encode(e) => FlyerError::encode("image/png", e.to_string()),
        other => FlyerError::encode("composite", other.to_string()),
    }
}
