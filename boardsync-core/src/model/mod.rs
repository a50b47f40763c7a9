mod element;
mod message;
mod participant;
mod room;
mod signaling;

pub use element::{ElementId, VersionedElement};
pub use message::{BoardMessage, UpdatePayload};
pub use participant::ParticipantId;
pub use room::RoomId;
pub use signaling::{IceServerConfig, SignalMessage};
