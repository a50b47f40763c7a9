pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod persist;
pub mod reconcile;
pub mod signaling;
pub mod surface;

mod link;
mod mesh;

pub use client::{ClientEvent, CollabClient};
pub use config::ClientConfig;
pub use error::ClientError;
pub use persist::{Persistence, PersistenceError};
pub use reconcile::{Reconciler, ReconcilerConfig, UpdateSink};
pub use signaling::{SignalingConnection, SignalingConnector, WsConnector};
pub use surface::{RenderingSurface, TransientFlags};
