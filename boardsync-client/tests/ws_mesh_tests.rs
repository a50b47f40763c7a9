use boardsync_client::{ClientConfig, ClientEvent, CollabClient};
use boardsync_core::{BoardMessage, ParticipantId, UpdatePayload, VersionedElement};
use boardsync_server::{RoomRegistry, router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

async fn start_server() -> SocketAddr {
    let registry = Arc::new(RoomRegistry::new());
    let app = router(registry);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

fn ws_config(addr: SocketAddr, id: &str) -> ClientConfig {
    let mut config = ClientConfig::new(format!("ws://{addr}/ws"), "doc1", id);
    // Loopback negotiation needs no STUN.
    config.ice_servers = Vec::new();
    config
}

async fn wait_for<F>(
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    timeout: Duration,
    mut pred: F,
) -> Option<ClientEvent>
where
    F: FnMut(&ClientEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let event = tokio::time::timeout_at(deadline, events.recv()).await.ok()??;
        if pred(&event) {
            return Some(event);
        }
    }
}

#[tokio::test]
async fn two_clients_mesh_over_a_real_relay() {
    init_tracing();
    let addr = start_server().await;

    let (alice, _alice_events) = CollabClient::with_websocket(ws_config(addr, "alice"));
    alice.connect();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (bob, _bob_events) = CollabClient::with_websocket(ws_config(addr, "bob"));
    bob.connect();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(alice.peers().await, vec![ParticipantId::from("bob")]);
    assert_eq!(bob.peers().await, vec![ParticipantId::from("alice")]);
}

#[tokio::test]
async fn update_travels_peer_to_peer_once_channels_open() {
    init_tracing();
    let addr = start_server().await;

    let (alice, mut alice_events) = CollabClient::with_websocket(ws_config(addr, "alice"));
    alice.connect();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (bob, mut bob_events) = CollabClient::with_websocket(ws_config(addr, "bob"));
    bob.connect();

    let opened = wait_for(&mut alice_events, CONNECT_TIMEOUT, |e| {
        matches!(e, ClientEvent::ConnectionOpen)
    })
    .await;
    assert!(opened.is_some(), "alice's data channel never opened");
    let opened = wait_for(&mut bob_events, CONNECT_TIMEOUT, |e| {
        matches!(e, ClientEvent::ConnectionOpen)
    })
    .await;
    assert!(opened.is_some(), "bob's data channel never opened");

    let mut element = VersionedElement::new("rect-1", 3);
    element
        .payload
        .insert("strokeColor".into(), serde_json::json!("#1e1e1e"));
    alice.broadcast(BoardMessage::Update {
        user_id: "alice".into(),
        drawing_id: "doc1".into(),
        payload: UpdatePayload {
            elements: vec![element],
            app_state: serde_json::json!({"isResizing": false}),
        },
    });

    let received = wait_for(&mut bob_events, CONNECT_TIMEOUT, |e| {
        matches!(e, ClientEvent::Message(_))
    })
    .await;
    let Some(ClientEvent::Message(BoardMessage::Update { user_id, payload, .. })) = received else {
        panic!("bob never received the update");
    };
    assert_eq!(user_id, ParticipantId::from("alice"));
    assert_eq!(payload.elements.len(), 1);
    assert_eq!(payload.elements[0].version, 3);
    assert_eq!(payload.elements[0].payload["strokeColor"], "#1e1e1e");

    alice.disconnect(true);
    bob.disconnect(true);
}
