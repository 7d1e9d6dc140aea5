// SPDX-License-Identifier: MIT
// CPU scaler built on fast_image_resize (SIMD-accelerated).
// RGBA8 in → RGBA8 out at an exact size; aspect ratio is not preserved.

use fast_image_resize as fir;
use fir::images::{TypedImage, TypedImageRef};
use fir::pixels::U8x4;
use fir::{ResizeOptions, Resizer};

use crate::presets::Size;

#[derive(Debug, thiserror::Error)]
pub enum ScaleError {
    #[error("source buffer holds {actual} bytes, expected {expected} for {size}")]
    BufferMismatch { size: Size, expected: usize, actual: usize },
    #[error("cannot scale to or from an empty size ({0})")]
    EmptySize(Size),
    #[error("fast image resize error: {0}")]
    Fir(#[from] fir::ResizeError),
    #[error("image buffer error: {0}")]
    ImageBuf(#[from] fir::ImageBufferError),
}

/// Stretch a tightly packed RGBA8 buffer to exactly `dst` pixels.
///
/// Alpha is premultiplied for the convolution and divided back out afterwards,
/// so transparent regions do not bleed dark fringes into their neighbours.
/// Equal sizes are copied through untouched.
pub fn stretch_rgba(
    resizer: &mut Resizer,
    src_rgba: &[u8],
    src: Size,
    dst: Size,
) -> Result<Vec<u8>, ScaleError> {
    if src.is_empty() {
        return Err(ScaleError::EmptySize(src));
    }
    if dst.is_empty() {
        return Err(ScaleError::EmptySize(dst));
    }
    if src_rgba.len() != src.rgba_len() {
        return Err(ScaleError::BufferMismatch {
            size: src,
            expected: src.rgba_len(),
            actual: src_rgba.len(),
        });
    }
    if src == dst {
        return Ok(src_rgba.to_vec());
    }

    let src_view = TypedImageRef::<U8x4>::from_buffer(src.w, src.h, src_rgba)?;
    let mut out = vec![0u8; dst.rgba_len()];
    let mut dst_image = TypedImage::<U8x4>::from_buffer(dst.w, dst.h, &mut out)?;

    let opts = ResizeOptions::new().use_alpha(true);
    resizer.resize_typed::<U8x4>(&src_view, &mut dst_image, &opts)?;

    Ok(out)
}
