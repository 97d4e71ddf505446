use async_trait::async_trait;
use relaycast_core::{PeerId, RoomId, SignalData};

/// Outbound side of the relay: how a room reaches the connections it routes between.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Tell the broadcaster a viewer is ready for an offer.
    async fn send_new_viewer(&self, broadcaster: PeerId, viewer_id: PeerId);

    /// Tell a waiting viewer that a broadcaster appeared.
    async fn send_new_broadcaster(&self, viewer: PeerId, room_id: RoomId);

    /// Tell the broadcaster to discard one viewer's session.
    async fn send_viewer_left(&self, broadcaster: PeerId, viewer_id: PeerId);

    /// The "no broadcaster" notice for one remaining viewer.
    async fn send_broadcaster_left(&self, viewer: PeerId, room_id: RoomId);

    /// Deliver a negotiation payload. `viewer_id` names the viewer session it belongs to.
    async fn relay_signal(&self, to: PeerId, room_id: RoomId, viewer_id: PeerId, data: SignalData);
}
