use boardsync_core::{BoardMessage, ParticipantId, SignalMessage};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use tracing::{debug, info, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

use crate::client::ClientEvent;
use crate::config::ClientConfig;
use crate::link::{LinkEvent, PeerLink};
use crate::signaling::{SignalingConnection, SignalingConnector};

pub(crate) enum Command {
    Connect,
    Disconnect { muted: bool },
    Broadcast(BoardMessage),
    Peers(oneshot::Sender<Vec<ParticipantId>>),
}

/// Per-client session loop: owns the signaling connection, the PeerLink
/// table, and the reconnect state. Commands, link events, and signaling
/// frames interleave here but each is processed to completion, so no
/// additional locking is needed anywhere in the mesh.
pub(crate) struct MeshSession {
    config: ClientConfig,
    connector: Arc<dyn SignalingConnector>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    link_tx: mpsc::Sender<LinkEvent>,
    link_rx: mpsc::Receiver<LinkEvent>,
    events: mpsc::UnboundedSender<ClientEvent>,
    links: HashMap<ParticipantId, PeerLink>,
    channels: HashMap<ParticipantId, Arc<RTCDataChannel>>,
    signaling: Option<SignalingConnection>,
    auto_reconnect: bool,
    reconnect_attempts: u32,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

/// Linear backoff for signaling reconnects, capped at ten seconds.
pub(crate) fn reconnect_delay(attempt: u32) -> Duration {
    Duration::from_millis(u64::min(10_000, (u64::from(attempt) + 1) * 1_000))
}

async fn recv_signal(
    rx: Option<&mut mpsc::UnboundedReceiver<SignalMessage>>,
) -> Option<SignalMessage> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn timer_fired(timer: Option<&mut Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}

impl MeshSession {
    pub(crate) fn new(
        config: ClientConfig,
        connector: Arc<dyn SignalingConnector>,
        command_rx: mpsc::UnboundedReceiver<Command>,
        link_tx: mpsc::Sender<LinkEvent>,
        link_rx: mpsc::Receiver<LinkEvent>,
        events: mpsc::UnboundedSender<ClientEvent>,
    ) -> Self {
        Self {
            config,
            connector,
            command_rx,
            link_tx,
            link_rx,
            events,
            links: HashMap::new(),
            channels: HashMap::new(),
            signaling: None,
            auto_reconnect: true,
            reconnect_attempts: 0,
            reconnect_timer: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(room = %self.config.room, "mesh session started");

        loop {
            let signal_rx = self.signaling.as_mut().map(|conn| &mut conn.rx);
            let timer = self.reconnect_timer.as_mut();

            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(Command::Connect) => self.handle_connect().await,
                    Some(Command::Disconnect { muted }) => self.handle_disconnect(muted).await,
                    Some(Command::Broadcast(message)) => self.handle_broadcast(message).await,
                    Some(Command::Peers(reply)) => {
                        let _ = reply.send(self.links.keys().cloned().collect());
                    }
                    None => {
                        // Every handle dropped; tear down quietly.
                        self.handle_disconnect(true).await;
                        break;
                    }
                },
                evt = self.link_rx.recv() => {
                    if let Some(evt) = evt {
                        self.handle_link_event(evt).await;
                    }
                },
                signal = recv_signal(signal_rx) => match signal {
                    Some(message) => self.handle_signal(message).await,
                    None => self.handle_signaling_closed(),
                },
                _ = timer_fired(timer) => {
                    self.reconnect_timer = None;
                    self.open_signaling().await;
                },
            }
        }

        debug!(room = %self.config.room, "mesh session finished");
    }

    async fn handle_connect(&mut self) {
        if self.signaling.is_some() || self.reconnect_timer.is_some() {
            debug!("connect ignored, signaling already open or opening");
            return;
        }
        self.auto_reconnect = true;
        self.open_signaling().await;
    }

    async fn open_signaling(&mut self) {
        match self.connector.connect().await {
            Ok(conn) => {
                info!(room = %self.config.room, "signaling connection established");
                let _ = conn.tx.send(SignalMessage::Join {
                    room: self.config.room.clone(),
                    from: self.config.participant.clone(),
                });
                self.signaling = Some(conn);
            }
            Err(e) => {
                warn!("signaling connect failed: {e}");
                self.handle_signaling_closed();
            }
        }
    }

    fn handle_signaling_closed(&mut self) {
        self.signaling = None;
        if !self.auto_reconnect {
            return;
        }
        let delay = reconnect_delay(self.reconnect_attempts);
        self.reconnect_attempts += 1;
        debug!(
            attempt = self.reconnect_attempts,
            "signaling connection lost, retrying in {delay:?}"
        );
        self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
    }

    async fn handle_disconnect(&mut self, muted: bool) {
        self.auto_reconnect = false;
        self.reconnect_attempts = 0;
        self.reconnect_timer = None;

        for (_, link) in self.links.drain() {
            link.close().await;
        }
        self.channels.clear();
        // Dropping the handles shuts down the socket pumps.
        self.signaling = None;

        let _ = self.events.send(ClientEvent::PeersChanged(Vec::new()));
        if !muted {
            let _ = self
                .events
                .send(ClientEvent::Notification("Connection closed".to_string()));
        }
        let _ = self.events.send(ClientEvent::ConnectionClose);
    }

    /// Best effort, at most once per peer: channels that are not open are
    /// skipped, nothing is queued.
    async fn handle_broadcast(&mut self, message: BoardMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize update: {e}");
                return;
            }
        };

        for (remote, channel) in &self.channels {
            if channel.ready_state() != RTCDataChannelState::Open {
                debug!(%remote, "data channel not open, skipping");
                continue;
            }
            if let Err(e) = channel.send_text(json.clone()).await {
                warn!(%remote, "data channel send failed: {e}");
            }
        }
    }

    async fn handle_signal(&mut self, message: SignalMessage) {
        match message {
            SignalMessage::Join { from, .. } => self.handle_peer_joined(from).await,
            SignalMessage::Offer { from, offer, .. } => self.handle_remote_offer(from, offer).await,
            SignalMessage::Answer { from, answer, .. } => {
                self.handle_remote_answer(from, answer).await
            }
            SignalMessage::IceCandidate {
                from, candidate, ..
            } => self.handle_remote_candidate(from, candidate).await,
            SignalMessage::Leave { from, .. } => self.remove_link(&from).await,
        }
    }

    /// A new participant announced itself. Existing members initiate; the
    /// newcomer only ever answers. This asymmetry is what prevents two sides
    /// of a pair from offering to each other at once.
    async fn handle_peer_joined(&mut self, remote: ParticipantId) {
        info!(%remote, "participant joined");
        self.drop_stale_link(&remote).await;

        let link = match self.new_link(remote.clone()).await {
            Some(link) => link,
            None => return,
        };

        match link.create_offer().await {
            Ok(offer) => {
                let to = link.remote().clone();
                self.links.insert(remote, link);
                self.emit_peers();
                self.send_signal(SignalMessage::Offer {
                    room: self.config.room.clone(),
                    from: self.config.participant.clone(),
                    to,
                    offer,
                });
            }
            Err(e) => warn!(%remote, "failed to create offer: {e}"),
        }
    }

    async fn handle_remote_offer(&mut self, remote: ParticipantId, offer: String) {
        info!(%remote, "received offer");
        self.drop_stale_link(&remote).await;

        let link = match self.new_link(remote.clone()).await {
            Some(link) => link,
            None => return,
        };

        match link.accept_offer(&offer).await {
            Ok(answer) => {
                let to = link.remote().clone();
                self.links.insert(remote, link);
                self.emit_peers();
                self.send_signal(SignalMessage::Answer {
                    room: self.config.room.clone(),
                    from: self.config.participant.clone(),
                    to,
                    answer,
                });
            }
            Err(e) => warn!(%remote, "failed to answer offer: {e}"),
        }
    }

    async fn handle_remote_answer(&mut self, remote: ParticipantId, answer: String) {
        let Some(link) = self.links.get(&remote) else {
            warn!(%remote, "answer for unknown participant, dropping");
            return;
        };
        if let Err(e) = link.apply_answer(&answer).await {
            warn!(%remote, "failed to apply answer: {e}");
        }
    }

    async fn handle_remote_candidate(&mut self, remote: ParticipantId, candidate: String) {
        // No buffering of early candidates; trickle ICE retries cover us.
        let Some(link) = self.links.get(&remote) else {
            debug!(%remote, "candidate for unknown participant, dropping");
            return;
        };
        if let Err(e) = link.add_candidate(&candidate).await {
            warn!(%remote, "failed to add ice candidate: {e}");
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::ChannelReady(remote, channel) => {
                info!(%remote, "peer link ready");
                let first = self.channels.is_empty();
                self.channels.insert(remote, channel);
                if first {
                    let _ = self.events.send(ClientEvent::ConnectionOpen);
                }
            }
            LinkEvent::Message(remote, data) => match serde_json::from_slice::<BoardMessage>(&data)
            {
                Ok(message) => {
                    let _ = self.events.send(ClientEvent::Message(message));
                }
                Err(e) => warn!(%remote, "invalid board message: {e}"),
            },
            LinkEvent::Disconnected(remote) => self.remove_link(&remote).await,
            LinkEvent::CandidateGenerated(remote, candidate) => {
                self.send_signal(SignalMessage::IceCandidate {
                    room: self.config.room.clone(),
                    from: self.config.participant.clone(),
                    to: remote,
                    candidate,
                });
            }
        }
    }

    async fn new_link(&mut self, remote: ParticipantId) -> Option<PeerLink> {
        match PeerLink::new(remote.clone(), &self.config.ice_servers, self.link_tx.clone()).await {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(%remote, "failed to create peer link: {e}");
                None
            }
        }
    }

    /// A joining peer we already track means its previous session died
    /// without a leave; start that pair over.
    async fn drop_stale_link(&mut self, remote: &ParticipantId) {
        if let Some(stale) = self.links.remove(remote) {
            debug!(%remote, "replacing stale link");
            self.channels.remove(remote);
            stale.close().await;
        }
    }

    async fn remove_link(&mut self, remote: &ParticipantId) {
        self.channels.remove(remote);
        if let Some(link) = self.links.remove(remote) {
            info!(%remote, "removing peer link");
            link.close().await;
            self.emit_peers();
        }
    }

    fn send_signal(&self, message: SignalMessage) {
        if let Some(conn) = &self.signaling {
            let _ = conn.tx.send(message);
        }
    }

    fn emit_peers(&self) {
        let _ = self
            .events
            .send(ClientEvent::PeersChanged(self.links.keys().cloned().collect()));
    }
}

#[cfg(test)]
mod tests {
    use super::reconnect_delay;
    use std::time::Duration;

    #[test]
    fn backoff_is_linear_then_capped() {
        // Attempts 1..4 wait 1s/2s/3s/4s.
        assert_eq!(reconnect_delay(0), Duration::from_millis(1_000));
        assert_eq!(reconnect_delay(1), Duration::from_millis(2_000));
        assert_eq!(reconnect_delay(2), Duration::from_millis(3_000));
        assert_eq!(reconnect_delay(3), Duration::from_millis(4_000));

        assert_eq!(reconnect_delay(9), Duration::from_millis(10_000));
        assert_eq!(reconnect_delay(10), Duration::from_millis(10_000));
        assert_eq!(reconnect_delay(1_000), Duration::from_millis(10_000));
    }
}
