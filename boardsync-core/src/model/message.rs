use crate::model::element::VersionedElement;
use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

/// Elements plus the opaque app-state object that rides along with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePayload {
    pub elements: Vec<VersionedElement>,
    #[serde(rename = "appState", default)]
    pub app_state: serde_json::Value,
}

/// Application message exchanged over an open data channel.
///
/// A single variant today; the tag leaves room for cursor presence and
/// similar additions without breaking old peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoardMessage {
    #[serde(rename = "update")]
    Update {
        #[serde(rename = "userId")]
        user_id: ParticipantId,
        #[serde(rename = "drawingId")]
        drawing_id: RoomId,
        payload: UpdatePayload,
    },
}
