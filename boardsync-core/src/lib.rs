pub mod model;

pub use model::{
    BoardMessage, ElementId, IceServerConfig, ParticipantId, RoomId, SignalMessage, UpdatePayload,
    VersionedElement,
};
