//! # Studio Session
//!
//! The stateful service object that drives a flyer from upload to export.
//! A [`Studio`] owns one active [`SourceImage`], the [`LayerStore`] derived
//! from it and a handle to the injected [`TransformGateway`].
//!
//! ## Concurrency
//!
//! `Studio` is a cheap `Clone` handle; clones share the same session. State
//! sits behind a `std::sync::Mutex` that is only ever locked for short,
//! synchronous sections and never held across an `.await`.
//!
//! Every write that comes back from the gateway is checked against the
//! [`SourceId`] captured when the request was dispatched. If the source was
//! replaced in the meantime (a new upload, a restoration or a generated
//! flyer), the result is dropped and the caller sees
//! [`LayerOutcome::Superseded`] or [`FlyerError::Superseded`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use flyer_layers::config::{ExportSettings, GatewayConfig};
//! use flyer_layers::core::UploadedFile;
//! use flyer_layers::gateway::GeminiGateway;
//! use flyer_layers::session::Studio;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = GeminiGateway::new(GatewayConfig::from_env()?)?;
//! let studio = Studio::builder().with_gateway(Arc::new(gateway)).build()?;
//!
//! let report = studio.upload(&UploadedFile::read("flyer.png").await?).await?;
//! println!("extracted: {:?}", report.extracted());
//!
//! let download = studio.export(&ExportSettings::default()).await?;
//! tokio::fs::write(&download.filename, download.artifact.bytes()).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{debug, info, warn};

use crate::config::{BackgroundSpec, EnhancementSettings, ExportSettings};
use crate::core::{
    Artifact, LayerKind, LayerMap, LayerStore, SourceId, SourceImage, UploadedFile,
    VisibilityMask, validate_upload,
};
use crate::error::{FlyerError, FlyerResult};
use crate::gateway::TransformGateway;
use crate::processing::codec;
use crate::processing::{Download, Flattened, compositor, export_final};

const CREATING_STATUS: &str = "Creating new flyer...";
const ENHANCING_STATUS: &str = "Enhancing...";
const GENERATED_FILE_NAME: &str = "new-flyer.png";

/// How one kind's extraction ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerOutcome {
    /// Stored for the source it was requested against.
    Extracted(Artifact),
    /// The gateway failed; the kind stays absent.
    Failed(String),
    /// The source was replaced before the result arrived; nothing was stored.
    Superseded,
}

/// Per-kind results of one separation pass.
#[derive(Debug, Clone)]
pub struct SeparationReport {
    pub source: SourceId,
    outcomes: LayerMap<LayerOutcome>,
}

impl SeparationReport {
    pub fn outcome(&self, kind: LayerKind) -> &LayerOutcome {
        self.outcomes.get(kind)
    }

    /// Kinds that were extracted and stored, in stacking order.
    pub fn extracted(&self) -> Vec<LayerKind> {
        self.kinds_where(|o| matches!(o, LayerOutcome::Extracted(_)))
    }

    /// Kinds whose extraction failed, with the reason.
    pub fn failed(&self) -> Vec<(LayerKind, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(kind, outcome)| match outcome {
                LayerOutcome::Failed(reason) => Some((kind, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn superseded(&self) -> Vec<LayerKind> {
        self.kinds_where(|o| matches!(o, LayerOutcome::Superseded))
    }

    fn kinds_where(&self, pred: impl Fn(&LayerOutcome) -> bool) -> Vec<LayerKind> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| pred(outcome))
            .map(|(kind, _)| kind)
            .collect()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    source: Option<SourceImage>,
    store: LayerStore,
    next_id: u64,
    /// Bumped per kind whenever a new request for that kind is dispatched.
    /// A single-layer result is only stored if its ticket is still current.
    tickets: LayerMap<u64>,
}

impl SessionState {
    fn active_id(&self) -> Option<SourceId> {
        self.source.as_ref().map(|s| s.id)
    }

    fn issue_ticket(&mut self, kind: LayerKind) -> u64 {
        let ticket = self.tickets.get_mut(kind);
        *ticket += 1;
        *ticket
    }

    fn source(&self, attempted: &str) -> FlyerResult<&SourceImage> {
        self.source
            .as_ref()
            .ok_or_else(|| FlyerError::state(attempted, "no source image is loaded"))
    }
}

/// Which artifact a single-layer operation sends to the gateway.
#[derive(Clone, Copy)]
enum LayerInput {
    Source,
    CurrentLayer,
}

/// Flyer layer session.
#[derive(Clone)]
pub struct Studio {
    gateway: Arc<dyn TransformGateway>,
    state: Arc<Mutex<SessionState>>,
}

impl fmt::Debug for Studio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Studio")
            .field("source", &state.active_id())
            .field("layers", &state.store.present())
            .finish_non_exhaustive()
    }
}

impl Studio {
    pub fn new(gateway: Arc<dyn TransformGateway>) -> Self {
        Self::with_state(gateway, LayerStore::new())
    }

    pub fn builder() -> StudioBuilder {
        StudioBuilder::new()
    }

    fn with_state(gateway: Arc<dyn TransformGateway>, store: LayerStore) -> Self {
        Self {
            gateway,
            state: Arc::new(Mutex::new(SessionState {
                store,
                ..SessionState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn source(&self) -> Option<SourceImage> {
        self.lock().source.clone()
    }

    pub fn layer(&self, kind: LayerKind) -> Option<Artifact> {
        self.lock().store.get(kind).cloned()
    }

    /// Snapshot of every layer slot.
    pub fn layers(&self) -> LayerMap<Option<Artifact>> {
        self.lock().store.artifacts().clone()
    }

    pub fn is_visible(&self, kind: LayerKind) -> bool {
        self.lock().store.visibility(kind)
    }

    pub fn visibility(&self) -> VisibilityMask {
        self.lock().store.visibility_mask().clone()
    }

    /// Flip a layer's visibility and return the new value.
    pub fn toggle_visibility(&self, kind: LayerKind) -> bool {
        self.lock().store.toggle_visibility(kind)
    }

    pub fn pending(&self, kind: LayerKind) -> Option<String> {
        self.lock().store.pending(kind).map(str::to_owned)
    }

    pub fn is_idle(&self) -> bool {
        self.lock().store.is_idle()
    }

    /// Validate `file`, make it the active source and separate it.
    ///
    /// Validation failures return before any gateway call and leave the
    /// session untouched.
    pub async fn upload(&self, file: &UploadedFile) -> FlyerResult<SeparationReport> {
        let upload = validate_upload(file)?;
        let source = {
            let mut state = self.lock();
            state.next_id += 1;
            let source = SourceImage {
                id: SourceId(state.next_id),
                name: upload.name,
                artifact: upload.artifact,
                width: upload.width,
                height: upload.height,
            };
            state.store.clear_all();
            state.source = Some(source.clone());
            source
        };
        info!(
            source = %source.id,
            name = %source.name,
            width = source.width,
            height = source.height,
            "source image replaced"
        );
        Ok(self.separate_layers(&source).await)
    }

    /// Extract every kind from `source` concurrently.
    ///
    /// Outcomes are stored as they arrive, so the store fills in gradually.
    /// One kind failing never affects the others, and this never fails as a
    /// whole. If `source` is not the active source nothing is dispatched and
    /// every kind is reported superseded.
    pub async fn separate_layers(&self, source: &SourceImage) -> SeparationReport {
        let mut outcomes = LayerMap::from_fn(|_| LayerOutcome::Superseded);
        {
            let mut state = self.lock();
            if state.active_id() != Some(source.id) {
                debug!(source = %source.id, "separation skipped for inactive source");
                return SeparationReport {
                    source: source.id,
                    outcomes,
                };
            }
            state.store.clear_all();
            for kind in LayerKind::STACKING_ORDER {
                state.issue_ticket(kind);
                state.store.set_pending(kind, format!("Separating {kind}..."));
            }
        }

        let gateway = &self.gateway;
        let image = &source.artifact;
        let mut inflight: FuturesUnordered<_> = LayerKind::STACKING_ORDER
            .into_iter()
            .map(|kind| async move { (kind, gateway.extract(image, kind).await) })
            .collect();

        while let Some((kind, result)) = inflight.next().await {
            *outcomes.get_mut(kind) = self.apply_extraction(source.id, kind, result);
        }

        let report = SeparationReport {
            source: source.id,
            outcomes,
        };
        info!(
            source = %source.id,
            extracted = ?report.extracted(),
            failed = report.failed().len(),
            superseded = report.superseded().len(),
            "layer separation finished"
        );
        report
    }

    fn apply_extraction(
        &self,
        dispatched_for: SourceId,
        kind: LayerKind,
        result: FlyerResult<Artifact>,
    ) -> LayerOutcome {
        let mut state = self.lock();
        if state.active_id() != Some(dispatched_for) {
            debug!(source = %dispatched_for, layer = %kind, "dropping stale extraction");
            return LayerOutcome::Superseded;
        }
        state.store.clear_pending(kind);
        match result {
            Ok(artifact) => {
                state.store.set(kind, artifact.clone());
                LayerOutcome::Extracted(artifact)
            }
            Err(e) => {
                warn!(layer = %kind, error = %e, "layer extraction failed");
                LayerOutcome::Failed(e.to_string())
            }
        }
    }

    /// Generate a new flyer from `prompt` and treat it as a fresh upload.
    ///
    /// A blank prompt is rejected before any remote call. On any failure,
    /// including a generated image that does not pass upload validation,
    /// only the "creating" statuses set here are cleared.
    pub async fn create_from_prompt(&self, prompt: &str) -> FlyerResult<SeparationReport> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(FlyerError::validation("prompt", "must not be empty", "")
                .with_user_message("Describe the flyer you want to create."));
        }

        let dispatched_for = {
            let mut state = self.lock();
            for kind in LayerKind::STACKING_ORDER {
                state.store.set_pending(kind, CREATING_STATUS);
            }
            state.active_id()
        };
        info!(prompt_len = prompt.len(), "generating flyer from prompt");

        let result = self.generate_and_upload(prompt, dispatched_for).await;
        if let Err(e) = &result {
            warn!(error = %e, "flyer creation failed");
            let mut state = self.lock();
            for kind in LayerKind::STACKING_ORDER {
                if state.store.pending(kind) == Some(CREATING_STATUS) {
                    state.store.clear_pending(kind);
                }
            }
        }
        result
    }

    async fn generate_and_upload(
        &self,
        prompt: &str,
        dispatched_for: Option<SourceId>,
    ) -> FlyerResult<SeparationReport> {
        let generated = self
            .gateway
            .generate_from_text(prompt)
            .await
            .map_err(|e| e.with_user_message("Failed to create new image from prompt."))?;

        let replaced = self.lock().active_id() != dispatched_for;
        if replaced {
            return Err(FlyerError::superseded("create flyer"));
        }
        let file = UploadedFile::from_artifact(
            GENERATED_FILE_NAME,
            &codec::normalize_for_upload(&generated)?,
        );
        self.upload(&file).await
    }

    /// Clean up the active source and re-run separation on the result.
    pub async fn restore_quality(&self) -> FlyerResult<SeparationReport> {
        let source = {
            let state = self.lock();
            state.source("restore quality")?.clone()
        };
        info!(source = %source.id, "restoring source quality");

        let restored = self
            .gateway
            .restore(&source.artifact)
            .await
            .map_err(|e| e.with_user_message("Failed to enhance image quality."))?;

        let replaced = self.lock().active_id() != Some(source.id);
        if replaced {
            return Err(FlyerError::superseded("restore quality"));
        }
        let file =
            UploadedFile::from_artifact(source.name, &codec::normalize_for_upload(&restored)?);
        self.upload(&file).await
    }

    /// Re-run extraction for one kind against the active source.
    ///
    /// Other kinds are not touched. A failure leaves the previous artifact in
    /// place. If a separation pass is started while the retry is in flight,
    /// the retry's result is dropped as superseded.
    pub async fn retry_layer(&self, kind: LayerKind) -> FlyerResult<Artifact> {
        let (source_id, ticket, input) = self.begin_layer_op(
            kind,
            "retry layer",
            format!("Re-generating {kind}..."),
            LayerInput::Source,
        )?;
        let result = self.gateway.extract(&input, kind).await;
        self.finish_layer_op(source_id, ticket, kind, "retry layer", result)
            .map_err(|e| e.with_user_message(format!("Failed to retry the {kind} layer.")))
    }

    /// Re-render the current `kind` layer with `settings`.
    pub async fn enhance_layer(
        &self,
        kind: LayerKind,
        settings: &EnhancementSettings,
    ) -> FlyerResult<Artifact> {
        let (source_id, ticket, input) = self.begin_layer_op(
            kind,
            "enhance layer",
            ENHANCING_STATUS.to_string(),
            LayerInput::CurrentLayer,
        )?;
        let result = self.gateway.enhance(&input, kind, settings).await;
        self.finish_layer_op(source_id, ticket, kind, "enhance layer", result)
            .map_err(|e| e.with_user_message(format!("Failed to enhance the {kind} layer.")))
    }

    fn begin_layer_op(
        &self,
        kind: LayerKind,
        operation: &str,
        status: String,
        input: LayerInput,
    ) -> FlyerResult<(SourceId, u64, Artifact)> {
        let mut state = self.lock();
        let source = state.source(operation)?;
        let source_id = source.id;
        let artifact = match input {
            LayerInput::Source => source.artifact.clone(),
            LayerInput::CurrentLayer => state.store.get(kind).cloned().ok_or_else(|| {
                FlyerError::state(operation, format!("there is no {kind} layer yet"))
            })?,
        };
        if let Some(busy) = state.store.pending(kind) {
            return Err(FlyerError::busy(kind.as_str(), busy));
        }
        state.store.set_pending(kind, status);
        let ticket = state.issue_ticket(kind);
        debug!(layer = %kind, operation, ticket, "layer operation dispatched");
        Ok((source_id, ticket, artifact))
    }

    fn finish_layer_op(
        &self,
        dispatched_for: SourceId,
        ticket: u64,
        kind: LayerKind,
        operation: &str,
        result: FlyerResult<Artifact>,
    ) -> FlyerResult<Artifact> {
        let mut state = self.lock();
        if state.active_id() != Some(dispatched_for) || *state.tickets.get(kind) != ticket {
            debug!(layer = %kind, operation, "dropping stale layer result");
            return Err(FlyerError::superseded(operation));
        }
        state.store.clear_pending(kind);
        match result {
            Ok(artifact) => {
                state.store.set(kind, artifact.clone());
                Ok(artifact)
            }
            Err(e) => {
                warn!(layer = %kind, operation, error = %e, "layer operation failed");
                Err(e.with_metadata("layer", kind.as_str()))
            }
        }
    }

    /// Flatten the visible layers at the source's natural size.
    pub fn composite(&self, background: BackgroundSpec) -> FlyerResult<Flattened> {
        let (layers, mask, width, height) = {
            let state = self.lock();
            let source = state.source("composite layers")?;
            (
                state.store.artifacts().clone(),
                state.store.visibility_mask().clone(),
                source.width,
                source.height,
            )
        };
        compositor::composite(&layers, &mask, width, height, background)
    }

    /// Composite with the settings' background, then upscale and encode.
    pub async fn export(&self, settings: &ExportSettings) -> FlyerResult<Download> {
        let flattened = self.composite(settings.background)?;
        export_final(self.gateway.as_ref(), &flattened.artifact, settings)
            .await
            .map_err(|e| e.with_user_message("Failed to export image with AI upscaling."))
    }

    /// The `kind` layer as `<kind>-layer.png`, or `None` if it is absent.
    pub fn download_layer(&self, kind: LayerKind) -> FlyerResult<Option<Download>> {
        match self.layer(kind) {
            Some(artifact) => Download::layer(kind, &artifact).map(Some),
            None => Ok(None),
        }
    }
}

/// Builder for [`Studio`].
#[derive(Default)]
pub struct StudioBuilder {
    gateway: Option<Arc<dyn TransformGateway>>,
    visibility: VisibilityMask,
}

impl StudioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn TransformGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Start with some layers hidden.
    pub fn with_visibility(mut self, visibility: VisibilityMask) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn build(self) -> FlyerResult<Studio> {
        let gateway = self
            .gateway
            .ok_or_else(|| FlyerError::config("gateway", "", "a transform gateway is required"))?;
        Ok(Studio::with_state(
            gateway,
            LayerStore::with_visibility(self.visibility),
        ))
    }
}
