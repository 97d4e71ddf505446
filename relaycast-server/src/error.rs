use relaycast_core::{PeerId, RoomId};

/// Reasons a signal is dropped at the relay. These are logged and counted,
/// never sent back to the client.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),

    #[error("connection {peer_id} is not a member of room {room_id}")]
    NotAMember { peer_id: PeerId, room_id: RoomId },

    #[error("viewer {0} is not in the room")]
    UnknownViewer(PeerId),

    #[error("signal from the broadcaster carries no viewer id")]
    MissingViewer,

    #[error("room {0} has no broadcaster")]
    NoBroadcaster(RoomId),
}
