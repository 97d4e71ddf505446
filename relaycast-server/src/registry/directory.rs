use crate::registry::{RoomRecord, RoomRegistry};
use async_trait::async_trait;
use relaycast_core::RoomId;

/// Read side of the room-persistence collaborator.
///
/// The relay ships an in-memory implementation over [`RoomRegistry`]; a
/// deployment backed by an external REST service implements this instead.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Allocates a fresh room. It is readable right away and reports no
    /// broadcaster until one joins.
    async fn create_room(&self) -> RoomId;

    async fn list_rooms(&self) -> Vec<RoomRecord>;

    async fn get_room(&self, room_id: &RoomId) -> Option<RoomRecord>;

    async fn broadcaster_present(&self, room_id: &RoomId) -> bool;
}

#[async_trait]
impl RoomDirectory for RoomRegistry {
    async fn create_room(&self) -> RoomId {
        self.reserve()
    }

    async fn list_rooms(&self) -> Vec<RoomRecord> {
        self.list()
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<RoomRecord> {
        self.get(room_id)
    }

    async fn broadcaster_present(&self, room_id: &RoomId) -> bool {
        self.is_broadcasting(room_id)
    }
}
