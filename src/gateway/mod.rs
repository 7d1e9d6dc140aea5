//! # Transform Gateway
//!
//! Abstract interface to the generative image service. The session and the
//! export stage only ever see this trait; the HTTP client in [`gemini`] is one
//! implementation and tests substitute a scripted fake.
//!
//! Every call is a single request/response. A failure carries only a reason
//! string (as [`FlyerError::Gateway`](crate::error::FlyerError::Gateway)); there
//! is no structured error code and nothing here retries.

pub mod directives;
pub mod gemini;

use async_trait::async_trait;

use crate::config::{EnhancementSettings, OutputFormat, ResolutionTier};
use crate::core::{Artifact, LayerKind};
use crate::error::FlyerResult;

pub use gemini::GeminiGateway;

/// Remote image transforms used by the pipeline.
#[async_trait]
pub trait TransformGateway: Send + Sync {
    /// Extract the `kind` layer from `image`.
    async fn extract(&self, image: &Artifact, kind: LayerKind) -> FlyerResult<Artifact>;

    /// Re-render an existing layer according to `settings`.
    async fn enhance(
        &self,
        image: &Artifact,
        kind: LayerKind,
        settings: &EnhancementSettings,
    ) -> FlyerResult<Artifact>;

    /// Clean up noise and compression artifacts in a whole flyer.
    async fn restore(&self, image: &Artifact) -> FlyerResult<Artifact>;

    /// Upscale a flattened flyer to `tier` and encode it as `format`.
    async fn super_resolve(
        &self,
        image: &Artifact,
        tier: ResolutionTier,
        format: OutputFormat,
    ) -> FlyerResult<Artifact>;

    /// Generate a new flyer from a text description.
    async fn generate_from_text(&self, prompt: &str) -> FlyerResult<Artifact>;
}
