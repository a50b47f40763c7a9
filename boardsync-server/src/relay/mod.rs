mod registry;

pub use registry::{ConnectionHandle, RoomRegistry};
