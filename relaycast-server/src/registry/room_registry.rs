use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relaycast_core::{PeerId, RoomId};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub id: RoomId,
    pub broadcaster_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcaster_connection_id: Option<PeerId>,
}

/// Outcome of [`RoomRegistry::create_or_get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The caller is now the room's broadcaster.
    Created,
    /// A live broadcaster already owns the room. Not an error.
    AlreadyRegistered { broadcaster: PeerId },
}

impl Registration {
    pub fn is_created(&self) -> bool {
        matches!(self, Registration::Created)
    }
}

/// Authoritative room-id → broadcaster mapping.
///
/// Creation is idempotent and atomic per room id, so racing broadcaster joins
/// always end with a single registered broadcaster.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<DashMap<RoomId, RoomRecord>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_or_get(&self, room_id: &RoomId, broadcaster: PeerId) -> Registration {
        match self.rooms.entry(room_id.clone()) {
            Entry::Occupied(mut entry) => match entry.get().broadcaster_connection_id {
                Some(existing) => {
                    debug!(room = %room_id, %existing, attempted = %broadcaster, "room already has a broadcaster");
                    Registration::AlreadyRegistered {
                        broadcaster: existing,
                    }
                }
                None => {
                    let record = entry.get_mut();
                    record.broadcaster_present = true;
                    record.broadcaster_connection_id = Some(broadcaster);
                    info!(room = %room_id, %broadcaster, "broadcaster registered");
                    Registration::Created
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(RoomRecord {
                    id: room_id.clone(),
                    broadcaster_present: true,
                    broadcaster_connection_id: Some(broadcaster),
                });
                info!(room = %room_id, %broadcaster, "room created");
                Registration::Created
            }
        }
    }

    /// Records a fresh room with no broadcaster. The first broadcaster to join
    /// it claims it through [`RoomRegistry::create_or_get`].
    pub fn reserve(&self) -> RoomId {
        let room_id = RoomId::new();
        self.rooms.insert(
            room_id.clone(),
            RoomRecord {
                id: room_id.clone(),
                broadcaster_present: false,
                broadcaster_connection_id: None,
            },
        );
        debug!(room = %room_id, "room reserved");
        room_id
    }

    /// Destroys the room if `broadcaster` still owns it.
    pub fn release(&self, room_id: &RoomId, broadcaster: PeerId) -> bool {
        let removed = self
            .rooms
            .remove_if(room_id, |_, record| {
                record.broadcaster_connection_id == Some(broadcaster)
            })
            .is_some();
        if removed {
            info!(room = %room_id, %broadcaster, "room destroyed");
        }
        removed
    }

    pub fn get(&self, room_id: &RoomId) -> Option<RoomRecord> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    pub fn is_broadcasting(&self, room_id: &RoomId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|entry| entry.broadcaster_present)
    }

    pub fn list(&self) -> Vec<RoomRecord> {
        let mut rooms: Vec<RoomRecord> = self
            .rooms
            .iter()
            .filter(|entry| entry.broadcaster_present)
            .map(|entry| entry.value().clone())
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
