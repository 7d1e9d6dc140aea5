//! # Flyer Layer Rebuild Library
//!
//! Decomposes a flyer image into semantic layers (background, person, text)
//! through a generative image service, lets each layer be re-generated or
//! enhanced on its own, flattens the visible layers back into one raster and
//! exports an upscaled final image.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `core`: Layer kinds, artifacts, the layer store and upload validation
//! - `gateway`: The transform gateway trait and its HTTP implementation
//! - `processing`: Compositing, export and local re-encoding
//! - `config`: Gateway configuration and per-operation settings
//! - `session`: The [`Studio`] that orchestrates all of the above
//! - `error`: [`FlyerError`] and its context
//!
//! Pixel-level work (stretching and blending) lives in the `flyer-compose`
//! workspace crate.
//!
//! ## Example
//!
//! ```rust
//! use flyer_layers::config::BackgroundSpec;
//! use flyer_layers::core::{LayerMap, VisibilityMask};
//! use flyer_layers::processing::composite;
//!
//! let flat = composite(&LayerMap::default(), &VisibilityMask::default(), 4, 4, BackgroundSpec::White)?;
//! assert!(flat.drawn.is_empty());
//! assert_eq!((flat.width, flat.height), (4, 4));
//! # Ok::<(), flyer_layers::FlyerError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod gateway;
pub mod processing;
pub mod session;

/// Re-export error types for convenience
pub use error::{ErrorContext, FlyerError, FlyerResult, HasUserMessage};

pub use config::{BackgroundSpec, EnhancementSettings, ExportSettings, GatewayConfig};
pub use core::{Artifact, LayerKind, MediaType, UploadedFile};
pub use gateway::{GeminiGateway, TransformGateway};
pub use session::{LayerOutcome, SeparationReport, Studio};
