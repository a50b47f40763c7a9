use boardsync_core::{ParticipantId, RoomId, SignalMessage};
use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Outbound half of one signaling connection. The transport layer drains the
/// receiver and serializes; the registry only ever pushes envelopes.
pub type ConnectionHandle = mpsc::UnboundedSender<SignalMessage>;

#[derive(Default)]
struct Room {
    participants: HashMap<ParticipantId, ConnectionHandle>,
}

/// Room-keyed blind relay. Holds who is in which room and forwards
/// envelopes; never inspects negotiation payloads and keeps no application
/// data. One registry per server instance.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one inbound envelope from `conn` to completion.
    ///
    /// `join` registers the sender (if new) and fans out to the rest of the
    /// room; `leave` removes the sender and fans out; directed messages are
    /// forwarded verbatim to their recipient, or silently dropped when the
    /// recipient already left.
    pub fn handle_message(&self, conn: &ConnectionHandle, message: SignalMessage) {
        match &message {
            SignalMessage::Join { room, from } => self.handle_join(conn, room, from, &message),
            SignalMessage::Leave { room, from } => self.handle_leave(room, from, &message),
            SignalMessage::Offer { room, to, .. }
            | SignalMessage::Answer { room, to, .. }
            | SignalMessage::IceCandidate { room, to, .. } => {
                self.forward_directed(room, to, &message)
            }
        }
    }

    /// A connection dropped without a `leave`. Remove the participant from
    /// every room it was in, tell the remaining members, and delete rooms
    /// that end up empty.
    pub fn connection_closed(&self, conn: &ConnectionHandle) {
        let mut emptied = Vec::new();

        for mut room in self.rooms.iter_mut() {
            let gone: Vec<ParticipantId> = room
                .participants
                .iter()
                .filter(|(_, handle)| handle.same_channel(conn))
                .map(|(id, _)| id.clone())
                .collect();

            for id in gone {
                info!(room = %room.key(), participant = %id, "connection closed, removing participant");
                room.participants.remove(&id);
                let leave = SignalMessage::Leave {
                    room: room.key().clone(),
                    from: id,
                };
                for handle in room.participants.values() {
                    forward(handle, &leave);
                }
            }

            if room.participants.is_empty() {
                emptied.push(room.key().clone());
            }
        }

        for room_id in emptied {
            self.delete_if_empty(&room_id);
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn participants(&self, room: &RoomId) -> Vec<ParticipantId> {
        self.rooms
            .get(room)
            .map(|room| room.participants.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn handle_join(
        &self,
        conn: &ConnectionHandle,
        room_id: &RoomId,
        from: &ParticipantId,
        message: &SignalMessage,
    ) {
        let mut room = self.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!(room = %room_id, "creating room");
            Room::default()
        });

        if !room.participants.contains_key(from) {
            room.participants.insert(from.clone(), conn.clone());
        }

        for (id, handle) in &room.participants {
            if id != from {
                forward(handle, message);
            }
        }
    }

    fn handle_leave(&self, room_id: &RoomId, from: &ParticipantId, message: &SignalMessage) {
        let mut now_empty = false;

        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.participants.remove(from);
            for handle in room.participants.values() {
                forward(handle, message);
            }
            now_empty = room.participants.is_empty();
        }

        if now_empty {
            self.delete_if_empty(room_id);
        }
    }

    fn forward_directed(&self, room_id: &RoomId, to: &ParticipantId, message: &SignalMessage) {
        let Some(room) = self.rooms.get(room_id) else {
            debug!(room = %room_id, "directed message for unknown room, dropping");
            return;
        };

        match room.participants.get(to) {
            Some(handle) => forward(handle, message),
            // The recipient already left; by design this is not an error.
            None => debug!(room = %room_id, recipient = %to, "recipient absent, dropping"),
        }
    }

    fn delete_if_empty(&self, room_id: &RoomId) {
        if self
            .rooms
            .remove_if(room_id, |_, room| room.participants.is_empty())
            .is_some()
        {
            info!(room = %room_id, "room empty, deleting");
        }
    }
}

fn forward(handle: &ConnectionHandle, message: &SignalMessage) {
    if let Err(e) = handle.send(message.clone()) {
        // The connection is on its way out; its own close handler cleans up.
        warn!("failed to forward signal: {e}");
    }
}
