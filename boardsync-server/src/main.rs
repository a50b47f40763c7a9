use anyhow::Result;
use boardsync_server::{RoomRegistry, router};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "boardsync-server")]
#[command(about = "Room-scoped signaling relay for collaborative boards")]
struct Args {
    /// Address to listen on for signaling WebSocket connections.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();
    let registry = Arc::new(RoomRegistry::new());
    let app = router(registry);

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("signaling server listening on ws://{}/ws", args.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
