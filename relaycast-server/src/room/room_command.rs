use relaycast_core::{PeerId, Role, SignalData};

/// Commands delivered to a room actor by the relay.
#[derive(Debug)]
pub enum RoomCommand {
    /// A connection declared its role in this room.
    Join { peer_id: PeerId, role: Role },

    /// Negotiation payload to route to the sender's counterpart.
    Signal {
        from: PeerId,
        viewer_id: Option<PeerId>,
        data: SignalData,
    },

    /// The connection left the room or its websocket closed.
    Disconnect { peer_id: PeerId },
}
