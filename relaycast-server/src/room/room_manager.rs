use crate::error::RelayError;
use crate::registry::RoomRegistry;
use crate::room::{Room, RoomCommand};
use crate::signaling::SignalingOutput;
use crate::stats::RelayStats;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relaycast_core::RoomId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tracing::{debug, info};

/// Spawns room actors on demand and retires them once they empty out.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>,
    signaling: Arc<dyn SignalingOutput>,
    registry: RoomRegistry,
    stats: Arc<RelayStats>,
    capacity: usize,
}

impl RoomManager {
    pub fn new(
        signaling: Arc<dyn SignalingOutput>,
        registry: RoomRegistry,
        stats: Arc<RelayStats>,
        capacity: usize,
    ) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            signaling,
            registry,
            stats,
            capacity: capacity.max(1),
        }
    }

    /// Delivers `cmd`, creating the room if needed.
    pub async fn dispatch(&self, room_id: &RoomId, mut cmd: RoomCommand) {
        loop {
            let sender = self.get_room_sender(room_id);
            match sender.send(cmd).await {
                Ok(()) => return,
                Err(SendError(returned)) => {
                    debug!(room = %room_id, "room retired under us, re-dispatching");
                    cmd = returned;
                }
            }
        }
    }

    /// Delivers `cmd` only to a room that already exists.
    pub async fn dispatch_existing(
        &self,
        room_id: &RoomId,
        mut cmd: RoomCommand,
    ) -> Result<(), RelayError> {
        loop {
            let Some(sender) = self.rooms.get(room_id).map(|entry| entry.value().clone()) else {
                return Err(RelayError::RoomNotFound(room_id.clone()));
            };
            match sender.send(cmd).await {
                Ok(()) => return Ok(()),
                Err(SendError(returned)) => cmd = returned,
            }
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    fn get_room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!(room = %room_id, "creating room");
                self.spawn_room(room_id.clone(), Vec::new())
            })
            .clone()
    }

    /// Must not touch `self.rooms`: callers may hold one of its entries.
    fn spawn_room(&self, room_id: RoomId, backlog: Vec<RoomCommand>) -> mpsc::Sender<RoomCommand> {
        let (tx, rx) = mpsc::channel(self.capacity.max(backlog.len()));
        for cmd in backlog {
            let _ = tx.try_send(cmd);
        }

        let room = Room::new(
            room_id.clone(),
            rx,
            self.signaling.clone(),
            self.registry.clone(),
            self.stats.clone(),
        );

        let manager = self.clone();
        let weak = tx.downgrade();
        tokio::spawn(async move {
            let rx = room.run().await;
            manager.retire(room_id, weak, rx);
        });

        tx
    }

    /// Removes an emptied room. Commands that slipped in while it was exiting
    /// are moved, in order, into a fresh actor that takes over the entry.
    fn retire(
        &self,
        room_id: RoomId,
        weak: mpsc::WeakSender<RoomCommand>,
        mut rx: mpsc::Receiver<RoomCommand>,
    ) {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.clone()) else {
            return;
        };

        let ours = weak
            .upgrade()
            .is_some_and(|sender| sender.same_channel(entry.get()));
        if !ours {
            return;
        }

        rx.close();
        let mut backlog = Vec::new();
        while let Ok(cmd) = rx.try_recv() {
            backlog.push(cmd);
        }

        if backlog.is_empty() {
            entry.remove();
            info!(room = %room_id, "room retired");
        } else {
            debug!(room = %room_id, pending = backlog.len(), "room revived by late commands");
            let sender = self.spawn_room(room_id, backlog);
            entry.insert(sender);
        }
    }
}
