mod peer;
mod role;
mod room;
mod signaling;

pub use peer::{ParsePeerIdError, PeerId};
pub use role::Role;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SignalData, SignalMessage};
