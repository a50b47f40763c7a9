use boardsync_core::{IceServerConfig, ParticipantId};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

use crate::error::ClientError;

pub(crate) const DATA_CHANNEL_LABEL: &str = "dataChannel";

/// Events a PeerLink feeds back into the session loop.
pub(crate) enum LinkEvent {
    /// The data channel toward this participant reached the open state.
    ChannelReady(ParticipantId, Arc<RTCDataChannel>),
    /// An application message arrived from this participant.
    Message(ParticipantId, Bytes),
    /// The channel closed or the connection reached a dead state.
    Disconnected(ParticipantId),
    /// A local ICE candidate to relay to this participant.
    CandidateGenerated(ParticipantId, String),
}

/// Client-side state for one remote participant: the peer connection and the
/// single data channel negotiated on it.
pub(crate) struct PeerLink {
    remote: ParticipantId,
    pc: Arc<RTCPeerConnection>,
    event_tx: mpsc::Sender<LinkEvent>,
}

impl PeerLink {
    pub(crate) async fn new(
        remote: ParticipantId,
        ice_servers: &[IceServerConfig],
        event_tx: mpsc::Sender<LinkEvent>,
    ) -> Result<Self, ClientError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(config).await?);

        // Dead connection states fold into the same teardown path as a
        // closed data channel.
        let state_tx = event_tx.clone();
        let state_remote = remote.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            let remote = state_remote.clone();
            Box::pin(async move {
                debug!(%remote, ?state, "peer connection state changed");
                match state {
                    RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected
                    | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(LinkEvent::Disconnected(remote)).await;
                    }
                    _ => {}
                }
            })
        }));

        // Trickle ICE: every locally discovered candidate goes out through
        // signaling to this one peer.
        let ice_tx = event_tx.clone();
        let ice_remote = remote.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let remote = ice_remote.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let Ok(json) = serde_json::to_string(&init) else {
                    return;
                };
                let _ = tx.send(LinkEvent::CandidateGenerated(remote, json)).await;
            })
        }));

        // Answerer side: the offerer created the channel, we receive it.
        let dc_tx = event_tx.clone();
        let dc_remote = remote.clone();
        pc.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let remote = dc_remote.clone();
            Box::pin(async move {
                debug!(%remote, label = %channel.label(), "data channel received");
                Self::register_channel(remote, channel, tx);
            })
        }));

        Ok(Self {
            remote,
            pc,
            event_tx,
        })
    }

    pub(crate) fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    /// Offerer path: open the data channel, then produce the local offer.
    /// Returns the serialized session description for the wire.
    pub(crate) async fn create_offer(&self) -> Result<String, ClientError> {
        let channel = self.pc.create_data_channel(DATA_CHANNEL_LABEL, None).await?;
        Self::register_channel(self.remote.clone(), channel, self.event_tx.clone());

        let offer = self.pc.create_offer(None).await?;
        self.pc.set_local_description(offer.clone()).await?;
        Ok(serde_json::to_string(&offer)?)
    }

    /// Answerer path: apply the remote offer and produce the local answer.
    pub(crate) async fn accept_offer(&self, offer: &str) -> Result<String, ClientError> {
        let desc: RTCSessionDescription = serde_json::from_str(offer)?;
        self.pc.set_remote_description(desc).await?;

        let answer = self.pc.create_answer(None).await?;
        self.pc.set_local_description(answer.clone()).await?;
        Ok(serde_json::to_string(&answer)?)
    }

    pub(crate) async fn apply_answer(&self, answer: &str) -> Result<(), ClientError> {
        let desc: RTCSessionDescription = serde_json::from_str(answer)?;
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    pub(crate) async fn add_candidate(&self, candidate: &str) -> Result<(), ClientError> {
        let init: RTCIceCandidateInit = serde_json::from_str(candidate)?;
        self.pc.add_ice_candidate(init).await?;
        Ok(())
    }

    pub(crate) async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            debug!(remote = %self.remote, "error closing peer connection: {e}");
        }
    }

    fn register_channel(
        remote: ParticipantId,
        channel: Arc<RTCDataChannel>,
        event_tx: mpsc::Sender<LinkEvent>,
    ) {
        let open_channel = channel.clone();
        let open_tx = event_tx.clone();
        let open_remote = remote.clone();
        channel.on_open(Box::new(move || {
            let tx = open_tx.clone();
            let remote = open_remote.clone();
            let channel = open_channel.clone();
            Box::pin(async move {
                info!(%remote, "data channel open");
                let _ = tx.send(LinkEvent::ChannelReady(remote, channel)).await;
            })
        }));

        let msg_tx = event_tx.clone();
        let msg_remote = remote.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = msg_tx.clone();
            let remote = msg_remote.clone();
            Box::pin(async move {
                let data = Bytes::from(msg.data.to_vec());
                let _ = tx.send(LinkEvent::Message(remote, data)).await;
            })
        }));

        channel.on_close(Box::new(move || {
            let tx = event_tx.clone();
            let remote = remote.clone();
            Box::pin(async move {
                debug!(%remote, "data channel closed");
                let _ = tx.send(LinkEvent::Disconnected(remote)).await;
            })
        }));
    }
}
