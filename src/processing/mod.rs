//! # Processing Module
//!
//! Local image work that sits between the layer store and the outside world:
//! flattening layers into one raster, handing the result to super-resolution
//! for export, and re-encoding artifacts when a format does not match.

pub mod codec;
pub mod compositor;
pub mod export;

pub use compositor::{Flattened, composite};
pub use export::{Download, export_final};
