// SPDX-License-Identifier: MIT
//! # flyer-compose: RGBA Canvas and Layer Blending
//!
//! Pixel-level building blocks for flattening flyer layers into one raster.
//! Nothing in here knows about layer kinds, remote services or sessions; the
//! caller decides what to draw and in which order.
//!
//! ## Key Components
//!
//! - [`presets`]: Output sizes and the export resolution tiers (1080p / 4k / 8k)
//! - [`cpu`]: Stretching RGBA8 buffers to an exact size with fast_image_resize
//! - [`blend`]: Straight-alpha source-over blending
//! - [`canvas`]: A fixed-size RGBA8 canvas that layers are stretched onto
//!
//! ## Usage Example
//!
//! ```rust
//! use flyer_compose::canvas::Canvas;
//! use flyer_compose::presets::Size;
//!
//! let mut canvas = Canvas::new(Size { w: 4, h: 4 });
//! canvas.fill([255, 255, 255, 255]);
//!
//! let mut resizer = fast_image_resize::Resizer::new();
//! let layer = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 128]));
//! canvas.draw_stretched(&mut resizer, &layer)?;
//!
//! let png = canvas.encode_png()?;
//! assert!(!png.is_empty());
//! # Ok::<(), flyer_compose::ComposeError>(())
//! ```

pub mod blend;
pub mod canvas;
pub mod cpu;
pub mod presets;

pub use canvas::Canvas;
pub use cpu::ScaleError;
pub use presets::{ResolutionTier, Size};

/// Errors raised while building or encoding a canvas.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("canvas size {w}x{h} is empty")]
    EmptyCanvas { w: u32, h: u32 },
    #[error("layer scaling failed: {0}")]
    Scale(#[from] ScaleError),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
