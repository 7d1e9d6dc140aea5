//! In-memory layer store: artifacts, visibility and pending statuses.
//!
//! The store does no I/O and knows nothing about where artifacts came from;
//! provenance checks happen in the session before anything is written here.

use crate::core::layer::{Artifact, LayerKind, LayerMap};

/// Per-kind visibility flags. Every kind starts visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityMask {
    flags: LayerMap<bool>,
}

impl Default for VisibilityMask {
    fn default() -> Self {
        Self {
            flags: LayerMap::from_fn(|_| true),
        }
    }
}

impl VisibilityMask {
    pub fn is_visible(&self, kind: LayerKind) -> bool {
        *self.flags.get(kind)
    }

    pub fn set(&mut self, kind: LayerKind, visible: bool) {
        *self.flags.get_mut(kind) = visible;
    }

    /// Flip one flag and return its new value.
    pub fn toggle(&mut self, kind: LayerKind) -> bool {
        let flag = self.flags.get_mut(kind);
        *flag = !*flag;
        *flag
    }

    /// Mask with only `kinds` visible.
    pub fn only(kinds: &[LayerKind]) -> Self {
        Self {
            flags: LayerMap::from_fn(|kind| kinds.contains(&kind)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    artifacts: LayerMap<Option<Artifact>>,
    visibility: VisibilityMask,
    pending: LayerMap<Option<String>>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visibility(visibility: VisibilityMask) -> Self {
        Self {
            visibility,
            ..Self::default()
        }
    }

    pub fn get(&self, kind: LayerKind) -> Option<&Artifact> {
        self.artifacts.get(kind).as_ref()
    }

    /// Replace whatever is stored for `kind`.
    pub fn set(&mut self, kind: LayerKind, artifact: Artifact) {
        *self.artifacts.get_mut(kind) = Some(artifact);
    }

    /// Drop every artifact and pending status. Visibility is kept.
    pub fn clear_all(&mut self) {
        self.artifacts = LayerMap::default();
        self.pending = LayerMap::default();
    }

    pub fn artifacts(&self) -> &LayerMap<Option<Artifact>> {
        &self.artifacts
    }

    /// Kinds that currently hold an artifact, in stacking order.
    pub fn present(&self) -> Vec<LayerKind> {
        self.artifacts
            .iter()
            .filter_map(|(kind, artifact)| artifact.as_ref().map(|_| kind))
            .collect()
    }

    pub fn visibility(&self, kind: LayerKind) -> bool {
        self.visibility.is_visible(kind)
    }

    pub fn toggle_visibility(&mut self, kind: LayerKind) -> bool {
        self.visibility.toggle(kind)
    }

    pub fn visibility_mask(&self) -> &VisibilityMask {
        &self.visibility
    }

    pub fn pending(&self, kind: LayerKind) -> Option<&str> {
        self.pending.get(kind).as_deref()
    }

    pub fn set_pending(&mut self, kind: LayerKind, status: impl Into<String>) {
        *self.pending.get_mut(kind) = Some(status.into());
    }

    pub fn clear_pending(&mut self, kind: LayerKind) {
        *self.pending.get_mut(kind) = None;
    }

    /// True when no kind has an operation in flight.
    pub fn is_idle(&self) -> bool {
        self.pending.iter().all(|(_, status)| status.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layer::MediaType;

    fn artifact(byte: u8) -> Artifact {
        Artifact::new(MediaType::Png, vec![byte])
    }

    #[test]
    fn set_replaces_previous_artifact() {
        let mut store = LayerStore::new();
        store.set(LayerKind::Person, artifact(1));
        store.set(LayerKind::Person, artifact(2));
        assert_eq!(store.get(LayerKind::Person), Some(&artifact(2)));
        assert_eq!(store.get(LayerKind::Text), None);
        assert_eq!(store.present(), vec![LayerKind::Person]);
    }

    #[test]
    fn clear_all_keeps_visibility() {
        let mut store = LayerStore::new();
        for kind in LayerKind::STACKING_ORDER {
            store.set(kind, artifact(7));
            store.set_pending(kind, "working");
        }
        assert!(!store.toggle_visibility(LayerKind::Text));

        store.clear_all();

        assert!(store.present().is_empty());
        assert!(store.is_idle());
        assert!(store.visibility(LayerKind::Background));
        assert!(!store.visibility(LayerKind::Text));
    }

    #[test]
    fn toggling_visibility_leaves_artifacts_alone() {
        let mut store = LayerStore::new();
        store.set(LayerKind::Background, artifact(3));
        store.toggle_visibility(LayerKind::Background);
        assert_eq!(store.get(LayerKind::Background), Some(&artifact(3)));
        assert!(store.toggle_visibility(LayerKind::Background));
    }

    #[test]
    fn pending_tracks_idle_state() {
        let mut store = LayerStore::new();
        assert!(store.is_idle());
        store.set_pending(LayerKind::Person, "Enhancing...");
        assert_eq!(store.pending(LayerKind::Person), Some("Enhancing..."));
        assert!(!store.is_idle());
        store.clear_pending(LayerKind::Person);
        assert!(store.is_idle());
    }

    #[test]
    fn only_mask() {
        let mask = VisibilityMask::only(&[LayerKind::Text]);
        assert!(!mask.is_visible(LayerKind::Background));
        assert!(!mask.is_visible(LayerKind::Person));
        assert!(mask.is_visible(LayerKind::Text));
    }
}
