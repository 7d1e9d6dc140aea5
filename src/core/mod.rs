//! # Core Data Model
//!
//! Layer kinds, artifacts, the layer store and the source image / upload
//! boundary. Everything in here is synchronous and free of remote calls.

pub mod layer;
pub mod source;
pub mod store;

pub use layer::{Artifact, LayerKind, LayerMap, MediaType};
pub use source::{
    MAX_SOURCE_PIXELS, MAX_SOURCE_SIDE, MAX_UPLOAD_BYTES, SourceId, SourceImage, UploadedFile,
    ValidatedUpload, check_dimensions, validate_upload,
};
pub use store::{LayerStore, VisibilityMask};
