use boardsync_core::{ParticipantId, RoomId, SignalMessage};
use boardsync_server::{ConnectionHandle, RoomRegistry};
use tokio::sync::mpsc;

/// One fake signaling connection: the handle the registry forwards into,
/// plus the inbox the test reads back out.
pub struct TestParticipant {
    pub id: ParticipantId,
    pub conn: ConnectionHandle,
    inbox: mpsc::UnboundedReceiver<SignalMessage>,
}

impl TestParticipant {
    pub fn new(id: &str) -> Self {
        let (conn, inbox) = mpsc::unbounded_channel();
        Self {
            id: id.into(),
            conn,
            inbox,
        }
    }

    pub fn join(&self, registry: &RoomRegistry, room: &str) {
        registry.handle_message(
            &self.conn,
            SignalMessage::Join {
                room: room.into(),
                from: self.id.clone(),
            },
        );
    }

    pub fn leave(&self, registry: &RoomRegistry, room: &str) {
        registry.handle_message(
            &self.conn,
            SignalMessage::Leave {
                room: room.into(),
                from: self.id.clone(),
            },
        );
    }

    pub fn offer_to(&self, registry: &RoomRegistry, room: &str, to: &str, sdp: &str) {
        registry.handle_message(
            &self.conn,
            SignalMessage::Offer {
                room: room.into(),
                from: self.id.clone(),
                to: to.into(),
                offer: sdp.to_string(),
            },
        );
    }

    /// Make forwarding to this participant fail, as if its socket died.
    pub fn close_inbox(&mut self) {
        self.inbox.close();
    }

    /// Everything queued so far, without waiting.
    pub fn drain(&mut self) -> Vec<SignalMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            out.push(msg);
        }
        out
    }
}

pub fn sorted_participants(registry: &RoomRegistry, room: &str) -> Vec<ParticipantId> {
    let mut ids = registry.participants(&RoomId::from(room));
    ids.sort();
    ids
}
