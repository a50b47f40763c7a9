use boardsync_core::{IceServerConfig, ParticipantId, RoomId};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the signaling relay.
    pub signaling_url: String,
    /// Document id; doubles as the room key.
    pub room: RoomId,
    /// Stable id of this session.
    pub participant: ParticipantId,
    /// ICE servers handed opaquely to peer-connection construction.
    pub ice_servers: Vec<IceServerConfig>,
}

impl ClientConfig {
    pub fn new(
        signaling_url: impl Into<String>,
        room: impl Into<RoomId>,
        participant: impl Into<ParticipantId>,
    ) -> Self {
        Self {
            signaling_url: signaling_url.into(),
            room: room.into(),
            participant: participant.into(),
            ice_servers: default_ice_servers(),
        }
    }
}

pub fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig {
        urls: vec!["stun:stun.l.google.com:19302".to_owned()],
        username: None,
        credential: None,
    }]
}
