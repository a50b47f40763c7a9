use async_trait::async_trait;
use boardsync_core::SignalMessage;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::ClientError;

/// One live signaling connection. Envelopes go out through `tx`
/// fire-and-forget; inbound envelopes arrive on `rx`, and `rx` closing means
/// the connection is gone.
pub struct SignalingConnection {
    pub tx: mpsc::UnboundedSender<SignalMessage>,
    pub rx: mpsc::UnboundedReceiver<SignalMessage>,
}

/// Opens signaling connections. Called once on `connect()` and again for
/// every reconnect attempt, so implementations must be reusable.
#[async_trait]
pub trait SignalingConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<SignalingConnection, ClientError>;
}

/// Production connector: JSON envelopes over a WebSocket.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(&self) -> Result<SignalingConnection, ClientError> {
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ClientError::Connect(e.to_string()))?;
        debug!(url = %self.url, "signaling socket open");

        let (mut sink, mut stream) = socket.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<SignalMessage>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<SignalMessage>();

        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("failed to serialize signal: {e}");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!("signaling socket error: {e}");
                        break;
                    }
                };
                match frame {
                    Message::Text(text) => {
                        match serde_json::from_str::<SignalMessage>(text.as_str()) {
                            Ok(signal) => {
                                if in_tx.send(signal).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("invalid signal envelope: {e}"),
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            // Dropping in_tx closes the session's receive side.
        });

        Ok(SignalingConnection { tx: out_tx, rx: in_rx })
    }
}
