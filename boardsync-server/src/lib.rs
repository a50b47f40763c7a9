pub mod relay;
pub mod signaling;

pub use relay::{ConnectionHandle, RoomRegistry};
pub use signaling::{router, ws_handler};
