use crate::relay::RoomRegistry;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use boardsync_core::SignalMessage;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

pub fn router(registry: Arc<RoomRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(registry)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<RoomRegistry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, registry))
}

async fn handle_socket(socket: WebSocket, registry: Arc<RoomRegistry>) {
    info!("new signaling connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SignalMessage>();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("failed to serialize signal: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // One frame at a time, each handled to completion; a bad frame from this
    // connection never reaches the registry.
    while let Some(Ok(frame)) = receiver.next().await {
        match frame {
            Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                Ok(signal) => registry.handle_message(&tx, signal),
                Err(e) => warn!("invalid signal envelope: {e}"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    registry.connection_closed(&tx);
    send_task.abort();
    info!("signaling connection closed");
}
