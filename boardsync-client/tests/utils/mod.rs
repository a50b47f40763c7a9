#![allow(dead_code)] // each test binary uses a different slice of these helpers

use async_trait::async_trait;
use boardsync_client::{ClientConfig, ClientError, SignalingConnection, SignalingConnector};
use boardsync_core::SignalMessage;
use boardsync_server::RoomRegistry;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// In-memory signaling hub: the real relay semantics, no sockets. Records
/// every envelope a client sends so tests can assert on the traffic.
#[derive(Clone, Default)]
pub struct MemoryHub {
    registry: Arc<RoomRegistry>,
    traffic: Arc<Mutex<Vec<SignalMessage>>>,
    pumps: Arc<Mutex<Vec<oneshot::Sender<()>>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> Arc<dyn SignalingConnector> {
        Arc::new(HubConnector { hub: self.clone() })
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn traffic(&self) -> Vec<SignalMessage> {
        self.traffic.lock().unwrap().clone()
    }

    pub fn joins_from(&self, id: &str) -> usize {
        self.traffic()
            .iter()
            .filter(|m| matches!(m, SignalMessage::Join { from, .. } if from.0 == id))
            .count()
    }

    pub fn offers_from(&self, id: &str) -> usize {
        self.traffic()
            .iter()
            .filter(|m| matches!(m, SignalMessage::Offer { from, .. } if from.0 == id))
            .count()
    }

    pub fn offers_to(&self, id: &str) -> usize {
        self.traffic()
            .iter()
            .filter(|m| matches!(m, SignalMessage::Offer { to, .. } if to.0 == id))
            .count()
    }

    pub fn answers_from(&self, id: &str) -> usize {
        self.traffic()
            .iter()
            .filter(|m| matches!(m, SignalMessage::Answer { from, .. } if from.0 == id))
            .count()
    }

    /// Kill every live connection pump, as if the relay process died. The
    /// pump runs its normal close path (`connection_closed`), which drops the
    /// registry's copy of the connection handle so the client-side receiver
    /// actually closes.
    pub fn sever(&self) {
        for pump in self.pumps.lock().unwrap().drain(..) {
            let _ = pump.send(());
        }
    }

    /// Raw relay connection for injecting hand-crafted envelopes.
    pub fn raw_connection(
        &self,
    ) -> (
        mpsc::UnboundedSender<SignalMessage>,
        mpsc::UnboundedReceiver<SignalMessage>,
    ) {
        let conn = self.open();
        (conn.tx, conn.rx)
    }

    fn open(&self) -> SignalingConnection {
        let (client_tx, mut hub_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (hub_tx, client_rx) = mpsc::unbounded_channel::<SignalMessage>();

        let registry = Arc::clone(&self.registry);
        let traffic = Arc::clone(&self.traffic);
        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = hub_rx.recv() => match msg {
                        Some(msg) => {
                            traffic.lock().unwrap().push(msg.clone());
                            registry.handle_message(&hub_tx, msg);
                        }
                        None => break,
                    },
                    _ = &mut kill_rx => break,
                }
            }
            registry.connection_closed(&hub_tx);
        });
        self.pumps.lock().unwrap().push(kill_tx);

        SignalingConnection {
            tx: client_tx,
            rx: client_rx,
        }
    }
}

struct HubConnector {
    hub: MemoryHub,
}

#[async_trait]
impl SignalingConnector for HubConnector {
    async fn connect(&self) -> Result<SignalingConnection, ClientError> {
        Ok(self.hub.open())
    }
}

/// Config for hub-backed tests: no ICE servers, loopback-only negotiation.
pub fn test_config(id: &str) -> ClientConfig {
    let mut config = ClientConfig::new("ws://unused.invalid/ws", "doc1", id);
    config.ice_servers = Vec::new();
    config
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
