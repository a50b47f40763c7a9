use boardsync_core::{BoardMessage, ParticipantId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::config::ClientConfig;
use crate::mesh::{Command, MeshSession};
use crate::signaling::{SignalingConnector, WsConnector};

/// What the session surfaces to the embedding application. Only
/// `Notification` is meant for the user's eyes; everything else is wiring.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// The set of participants we hold PeerLinks for changed.
    PeersChanged(Vec<ParticipantId>),
    /// An application message arrived from some peer.
    Message(BoardMessage),
    /// The first data channel reached the open state.
    ConnectionOpen,
    /// The session was torn down.
    ConnectionClose,
    /// User-visible notice (connect/disconnect only).
    Notification(String),
}

/// Handle to one collaboration session. Cheap to clone; all calls are
/// fire-and-forget commands into the session loop.
#[derive(Clone)]
pub struct CollabClient {
    commands: mpsc::UnboundedSender<Command>,
}

impl CollabClient {
    /// Spawn a session driven by the given connector.
    pub fn spawn(
        config: ClientConfig,
        connector: Arc<dyn SignalingConnector>,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::channel(256);

        let session = MeshSession::new(config, connector, command_rx, link_tx, link_rx, event_tx);
        tokio::spawn(session.run());

        (Self { commands: command_tx }, event_rx)
    }

    /// Spawn a session speaking WebSocket to `config.signaling_url`.
    pub fn with_websocket(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let connector = Arc::new(WsConnector::new(config.signaling_url.clone()));
        Self::spawn(config, connector)
    }

    /// Open the signaling connection and join the room. No-op while a
    /// connection is already open or being opened.
    pub fn connect(&self) {
        let _ = self.commands.send(Command::Connect);
    }

    /// Close every peer link and the signaling connection and stop
    /// reconnecting. Raises a user-visible notification unless `muted`.
    pub fn disconnect(&self, muted: bool) {
        let _ = self.commands.send(Command::Disconnect { muted });
    }

    /// Send an update to every peer whose data channel is open right now.
    pub fn broadcast(&self, message: BoardMessage) {
        let _ = self.commands.send(Command::Broadcast(message));
    }

    /// Participants we currently hold a PeerLink for.
    pub async fn peers(&self) -> Vec<ParticipantId> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Peers(tx)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }
}
