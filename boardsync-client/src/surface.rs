use boardsync_core::VersionedElement;

/// Live interactions (drag, resize) mutate elements without bumping the
/// version every frame; any set flag counts as a real change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransientFlags {
    pub dragging: bool,
    pub resizing: bool,
}

impl TransientFlags {
    pub fn any(&self) -> bool {
        self.dragging || self.resizing
    }
}

/// The canvas/document editor as the reconciler sees it.
///
/// Implementations are expected to route their own change events into
/// [`crate::Reconciler::on_local_change`] — including the change that
/// `apply_remote` itself causes.
pub trait RenderingSurface: Send + Sync + 'static {
    fn current_elements(&self) -> Vec<VersionedElement>;
    fn current_app_state(&self) -> serde_json::Value;
    fn apply_remote(&self, elements: Vec<VersionedElement>, app_state: serde_json::Value);
}
