use boardsync_core::{BoardMessage, ElementId, ParticipantId, RoomId, UpdatePayload, VersionedElement};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::CollabClient;
use crate::debounce::Debouncer;
use crate::persist::Persistence;
use crate::surface::{RenderingSurface, TransientFlags};

/// Where debounced updates go. [`CollabClient`] is the production sink; the
/// seam exists so reconciliation can be exercised without a mesh.
pub trait UpdateSink: Send + Sync + 'static {
    fn send_update(&self, message: BoardMessage);
}

impl UpdateSink for CollabClient {
    fn send_update(&self, message: BoardMessage) {
        self.broadcast(message);
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Quiet period before a burst of local changes becomes one broadcast.
    pub broadcast_debounce: Duration,
    /// Quiet period before a durable save. Two orders of magnitude longer
    /// than the broadcast debounce: peers need the change now, storage does
    /// not.
    pub save_debounce: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            broadcast_debounce: Duration::from_millis(100),
            save_debounce: Duration::from_secs(10),
        }
    }
}

/// Merges concurrent local and remote edits during a live session.
///
/// Keeps a baseline of last-accepted element versions and compares against
/// it to decide whether a local change event is worth broadcasting; a
/// one-shot flag marks the change event that a remote apply is about to
/// cause, so it never echoes back into the mesh. Conflict policy is
/// last-writer-wins per element by version; there is no field-level merge.
pub struct Reconciler {
    document: RoomId,
    local_id: ParticipantId,
    sink: Arc<dyn UpdateSink>,
    surface: Arc<dyn RenderingSurface>,
    persistence: Option<Arc<dyn Persistence>>,
    baseline: Mutex<HashMap<ElementId, u64>>,
    remote_update: AtomicBool,
    broadcast_debounce: Debouncer,
    save_debounce: Debouncer,
}

impl Reconciler {
    pub fn new(
        document: impl Into<RoomId>,
        local_id: impl Into<ParticipantId>,
        sink: Arc<dyn UpdateSink>,
        surface: Arc<dyn RenderingSurface>,
        persistence: Option<Arc<dyn Persistence>>,
        config: ReconcilerConfig,
    ) -> Self {
        let baseline = baseline_of(&surface.current_elements());
        Self {
            document: document.into(),
            local_id: local_id.into(),
            sink,
            surface,
            persistence,
            baseline: Mutex::new(baseline),
            remote_update: AtomicBool::new(false),
            broadcast_debounce: Debouncer::new(config.broadcast_debounce),
            save_debounce: Debouncer::new(config.save_debounce),
        }
    }

    /// The rendering surface reported a change event. Decide whether it is a
    /// real local change, schedule the debounced broadcast if so, and move
    /// the baseline forward either way.
    pub fn on_local_change(
        &self,
        elements: &[VersionedElement],
        app_state: &serde_json::Value,
        flags: TransientFlags,
    ) {
        self.schedule_save(elements.to_vec(), app_state.clone());

        if self.remote_update.swap(false, Ordering::SeqCst) {
            debug!("change event caused by remote apply, not rebroadcasting");
            return;
        }

        let mut changed = flags.any();
        {
            let baseline = self.baseline.lock().expect("baseline mutex poisoned");
            for element in elements {
                match baseline.get(&element.id) {
                    None => changed = true,
                    Some(&known) if element.version > known => changed = true,
                    Some(&known) if element.version < known => {
                        // Stale out-of-order echo; diagnostic only.
                        warn!(
                            element = %element.id,
                            known,
                            seen = element.version,
                            "element version regressed, ignoring"
                        );
                    }
                    Some(_) => {}
                }
            }
        }

        if changed {
            let message = BoardMessage::Update {
                user_id: self.local_id.clone(),
                drawing_id: self.document.clone(),
                payload: UpdatePayload {
                    elements: elements.to_vec(),
                    app_state: app_state.clone(),
                },
            };
            let sink = Arc::clone(&self.sink);
            self.broadcast_debounce.schedule(async move {
                sink.send_update(message);
            });
        }

        self.advance_baseline(elements);
    }

    /// An update arrived from a peer. Apply it to the surface and absorb the
    /// change event that apply will cause.
    pub fn on_remote_message(&self, message: BoardMessage) {
        let BoardMessage::Update { payload, .. } = message;

        self.remote_update.store(true, Ordering::SeqCst);
        self.surface.apply_remote(payload.elements, payload.app_state);

        let applied = self.surface.current_elements();
        self.advance_baseline(&applied);
    }

    /// Replace the baseline with the current element set, never letting a
    /// surviving element's accepted version move backwards.
    fn advance_baseline(&self, elements: &[VersionedElement]) {
        let mut baseline = self.baseline.lock().expect("baseline mutex poisoned");
        let mut next = HashMap::with_capacity(elements.len());
        for element in elements {
            let floor = baseline.get(&element.id).copied().unwrap_or(0);
            next.insert(element.id.clone(), element.version.max(floor));
        }
        *baseline = next;
    }

    fn schedule_save(&self, elements: Vec<VersionedElement>, app_state: serde_json::Value) {
        let Some(persistence) = self.persistence.as_ref().map(Arc::clone) else {
            return;
        };
        let document = self.document.clone();
        self.save_debounce.schedule(async move {
            match persistence.save(&document, elements, app_state).await {
                Ok(()) => debug!(%document, "auto save complete"),
                Err(e) => warn!(%document, "auto save failed: {e}"),
            }
        });
    }
}

fn baseline_of(elements: &[VersionedElement]) -> HashMap<ElementId, u64> {
    elements
        .iter()
        .map(|element| (element.id.clone(), element.version))
        .collect()
}
