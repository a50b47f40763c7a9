use async_trait::async_trait;
use boardsync_core::{RoomId, UpdatePayload, VersionedElement};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("persistence backend error: {0}")]
pub struct PersistenceError(pub String);

/// Durable document storage, implemented outside this crate. Saves run on a
/// much longer debounce than peer broadcast and never sit on the
/// interaction path.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    async fn load(&self, document: &RoomId) -> Result<UpdatePayload, PersistenceError>;

    async fn save(
        &self,
        document: &RoomId,
        elements: Vec<VersionedElement>,
        app_state: serde_json::Value,
    ) -> Result<(), PersistenceError>;
}
