use crate::model::participant::ParticipantId;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// One signaling envelope as it travels over the wire.
///
/// `join`/`leave` are room-scoped announcements; `offer`/`answer`/
/// `iceCandidate` are addressed to a single recipient and carry their
/// negotiation payload as an opaque pre-serialized string. The relay never
/// looks inside those payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignalMessage {
    #[serde(rename = "join")]
    Join { room: RoomId, from: ParticipantId },

    #[serde(rename = "leave")]
    Leave { room: RoomId, from: ParticipantId },

    #[serde(rename = "offer")]
    Offer {
        room: RoomId,
        from: ParticipantId,
        to: ParticipantId,
        offer: String,
    },

    #[serde(rename = "answer")]
    Answer {
        room: RoomId,
        from: ParticipantId,
        to: ParticipantId,
        answer: String,
    },

    #[serde(rename = "iceCandidate")]
    IceCandidate {
        room: RoomId,
        from: ParticipantId,
        to: ParticipantId,
        candidate: String,
    },
}

impl SignalMessage {
    pub fn room(&self) -> &RoomId {
        match self {
            Self::Join { room, .. }
            | Self::Leave { room, .. }
            | Self::Offer { room, .. }
            | Self::Answer { room, .. }
            | Self::IceCandidate { room, .. } => room,
        }
    }

    pub fn sender(&self) -> &ParticipantId {
        match self {
            Self::Join { from, .. }
            | Self::Leave { from, .. }
            | Self::Offer { from, .. }
            | Self::Answer { from, .. }
            | Self::IceCandidate { from, .. } => from,
        }
    }

    /// Recipient id for directed messages; `None` for room-scoped ones.
    pub fn recipient(&self) -> Option<&ParticipantId> {
        match self {
            Self::Join { .. } | Self::Leave { .. } => None,
            Self::Offer { to, .. } | Self::Answer { to, .. } | Self::IceCandidate { to, .. } => {
                Some(to)
            }
        }
    }
}
