// SPDX-License-Identifier: MIT
//! Fixed-size RGBA8 canvas that layer images are stretched onto.

use std::io::Cursor;

use fast_image_resize::Resizer;
use image::{ImageFormat, RgbaImage};

use crate::blend::{over_in_place, Rgba8};
use crate::cpu::stretch_rgba;
use crate::presets::Size;
use crate::ComposeError;

/// Straight-alpha RGBA8 raster, tightly packed, row-major.
#[derive(Clone, Debug)]
pub struct Canvas {
    size: Size,
    pixels: Vec<u8>,
}

impl Canvas {
    /// Fully transparent canvas of `size`.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![0u8; size.rgba_len()],
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.size.w || y >= self.size.h {
            return None;
        }
        let i = ((y as usize) * (self.size.w as usize) + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba8) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Stretch `layer` to the canvas size and blend it on top.
    pub fn draw_stretched(
        &mut self,
        resizer: &mut Resizer,
        layer: &RgbaImage,
    ) -> Result<(), ComposeError> {
        if self.size.is_empty() {
            return Err(ComposeError::EmptyCanvas {
                w: self.size.w,
                h: self.size.h,
            });
        }
        let layer_size = Size {
            w: layer.width(),
            h: layer.height(),
        };
        let stretched = stretch_rgba(resizer, layer.as_raw(), layer_size, self.size)?;
        // Sizes match by construction.
        over_in_place(&mut self.pixels, &stretched);
        Ok(())
    }

    /// Lossless PNG encoding of the current contents.
    pub fn encode_png(&self) -> Result<Vec<u8>, ComposeError> {
        if self.size.is_empty() {
            return Err(ComposeError::EmptyCanvas {
                w: self.size.w,
                h: self.size.h,
            });
        }
        let mut out = Cursor::new(Vec::new());
        image::write_buffer_with_format(
            &mut out,
            &self.pixels,
            self.size.w,
            self.size.h,
            image::ExtendedColorType::Rgba8,
            ImageFormat::Png,
        )?;
        Ok(out.into_inner())
    }
}
