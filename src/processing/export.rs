//! Final export: super-resolution of a flattened flyer plus local format fixup.

use tracing::{info, warn};

use crate::config::ExportSettings;
use crate::core::{Artifact, LayerKind, MediaType};
use crate::error::FlyerResult;
use crate::gateway::TransformGateway;
use crate::processing::codec;

/// A named payload ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub artifact: Artifact,
}

impl Download {
    /// A single layer saved as `<kind>-layer.png`.
    ///
    /// Layers held in another encoding are converted to PNG first.
    pub fn layer(kind: LayerKind, artifact: &Artifact) -> FlyerResult<Self> {
        Ok(Self {
            filename: kind.download_filename(),
            artifact: codec::transcode(artifact, MediaType::Png)?,
        })
    }
}

/// Send a flattened flyer through super-resolution and name the result.
///
/// The returned artifact always carries the requested format's media type. If
/// the service answers in a different encoding it is converted locally.
pub async fn export_final(
    gateway: &dyn TransformGateway,
    flattened: &Artifact,
    settings: &ExportSettings,
) -> FlyerResult<Download> {
    info!(
        format = %settings.format,
        resolution = %settings.resolution,
        "exporting flyer"
    );
    let upscaled = gateway
        .super_resolve(flattened, settings.resolution, settings.format)
        .await?;

    let wanted = settings.format.media_type();
    let artifact = if upscaled.media_type() == wanted {
        upscaled
    } else {
        warn!(
            returned = %upscaled.media_type(),
            requested = %wanted,
            "service answered in a different format, converting locally"
        );
        codec::transcode(&upscaled, wanted)?
    };

    Ok(Download {
        filename: settings.filename(),
        artifact,
    })
}
