use crate::error::RelayError;
use crate::registry::{Registration, RoomRegistry};
use crate::room::room_command::RoomCommand;
use crate::signaling::SignalingOutput;
use crate::stats::RelayStats;
use relaycast_core::{PeerId, Role, RoomId, SignalData};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Actor owning the routing table of one room.
///
/// Every join, leave and signal of the room passes through its command loop,
/// so a departing broadcaster can never race a new-viewer introduction.
pub struct Room {
    room_id: RoomId,
    broadcaster: Option<PeerId>,
    /// Viewers in join order, introduced to the broadcaster in that order.
    viewers: Vec<PeerId>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
    registry: RoomRegistry,
    stats: Arc<RelayStats>,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        registry: RoomRegistry,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            room_id,
            broadcaster: None,
            viewers: Vec::new(),
            command_rx,
            signaling,
            registry,
            stats,
        }
    }

    /// Runs until the room is empty or every sender is gone, then hands the
    /// receiver back so the manager can drain commands that raced the exit.
    pub async fn run(mut self) -> mpsc::Receiver<RoomCommand> {
        info!(room = %self.room_id, "room event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.is_empty() {
                break;
            }
        }

        info!(room = %self.room_id, "room event loop finished");
        self.command_rx
    }

    fn is_empty(&self) -> bool {
        self.broadcaster.is_none() && self.viewers.is_empty()
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                peer_id,
                role: Role::Broadcaster,
            } => self.join_broadcaster(peer_id).await,

            RoomCommand::Join {
                peer_id,
                role: Role::Viewer,
            } => self.join_viewer(peer_id).await,

            RoomCommand::Signal {
                from,
                viewer_id,
                data,
            } => {
                let kind = data.kind();
                match self.route_signal(from, viewer_id, data).await {
                    Ok(()) => self.stats.record_routed(),
                    Err(e) => {
                        debug!(room = %self.room_id, %from, kind, "signal dropped: {}", e);
                        self.stats.record_dropped();
                    }
                }
            }

            RoomCommand::Disconnect { peer_id } => self.remove_member(peer_id).await,
        }
    }

    async fn join_broadcaster(&mut self, peer_id: PeerId) {
        if self.broadcaster == Some(peer_id) {
            debug!(room = %self.room_id, %peer_id, "broadcaster re-joined, nothing to do");
            return;
        }

        match self.registry.create_or_get(&self.room_id, peer_id) {
            Registration::Created => {}
            Registration::AlreadyRegistered { broadcaster } => {
                warn!(
                    room = %self.room_id,
                    %peer_id,
                    %broadcaster,
                    "room already has a live broadcaster, join absorbed"
                );
                return;
            }
        }

        // A viewer switching roles stops being a viewer first.
        self.viewers.retain(|viewer| *viewer != peer_id);
        self.broadcaster = Some(peer_id);

        for viewer in &self.viewers {
            self.signaling
                .send_new_broadcaster(*viewer, self.room_id.clone())
                .await;
            self.signaling.send_new_viewer(peer_id, *viewer).await;
        }

        info!(
            room = %self.room_id,
            broadcaster = %peer_id,
            waiting = self.viewers.len(),
            "broadcaster joined"
        );
    }

    async fn join_viewer(&mut self, peer_id: PeerId) {
        if self.broadcaster == Some(peer_id) {
            warn!(room = %self.room_id, %peer_id, "broadcaster tried to join its own room as viewer");
            return;
        }

        if self.viewers.contains(&peer_id) {
            debug!(room = %self.room_id, %peer_id, "viewer already subscribed");
            return;
        }

        self.viewers.push(peer_id);

        match self.broadcaster {
            Some(broadcaster) => {
                info!(room = %self.room_id, viewer = %peer_id, "viewer joined");
                self.signaling.send_new_viewer(broadcaster, peer_id).await;
            }
            None => info!(room = %self.room_id, viewer = %peer_id, "viewer waiting for a broadcaster"),
        }
    }

    async fn route_signal(
        &self,
        from: PeerId,
        viewer_id: Option<PeerId>,
        data: SignalData,
    ) -> Result<(), RelayError> {
        if self.broadcaster == Some(from) {
            let viewer = viewer_id.ok_or(RelayError::MissingViewer)?;
            if !self.viewers.contains(&viewer) {
                return Err(RelayError::UnknownViewer(viewer));
            }
            self.signaling
                .relay_signal(viewer, self.room_id.clone(), viewer, data)
                .await;
            return Ok(());
        }

        if !self.viewers.contains(&from) {
            return Err(RelayError::NotAMember {
                peer_id: from,
                room_id: self.room_id.clone(),
            });
        }

        let broadcaster = self
            .broadcaster
            .ok_or_else(|| RelayError::NoBroadcaster(self.room_id.clone()))?;

        // Whatever the viewer claims, the broadcaster must see the real sender.
        self.signaling
            .relay_signal(broadcaster, self.room_id.clone(), from, data)
            .await;
        Ok(())
    }

    async fn remove_member(&mut self, peer_id: PeerId) {
        if self.broadcaster == Some(peer_id) {
            self.broadcaster = None;
            self.registry.release(&self.room_id, peer_id);

            for viewer in &self.viewers {
                self.signaling
                    .send_broadcaster_left(*viewer, self.room_id.clone())
                    .await;
            }

            info!(
                room = %self.room_id,
                broadcaster = %peer_id,
                notified = self.viewers.len(),
                "broadcaster left"
            );
            return;
        }

        let Some(position) = self.viewers.iter().position(|viewer| *viewer == peer_id) else {
            debug!(room = %self.room_id, %peer_id, "disconnect for non-member ignored");
            return;
        };
        self.viewers.remove(position);

        if let Some(broadcaster) = self.broadcaster {
            self.signaling.send_viewer_left(broadcaster, peer_id).await;
        }

        info!(room = %self.room_id, viewer = %peer_id, "viewer left");
    }
}
