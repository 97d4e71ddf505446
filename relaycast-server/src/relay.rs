use crate::config::RelayConfig;
use crate::registry::RoomRegistry;
use crate::room::{RoomCommand, RoomManager};
use crate::signaling::SignalingService;
use crate::stats::{RelayStats, RelayStatsSnapshot};
use axum::extract::ws::Message;
use relaycast_core::{PeerId, Role, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The signaling relay: connection table, room actors and room registry.
#[derive(Clone)]
pub struct Relay {
    signaling: SignalingService,
    rooms: RoomManager,
    registry: RoomRegistry,
    stats: Arc<RelayStats>,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Self {
        let signaling = SignalingService::new(config.ice_servers.clone());
        let registry = RoomRegistry::new();
        let stats = Arc::new(RelayStats::default());
        let rooms = RoomManager::new(
            Arc::new(signaling.clone()),
            registry.clone(),
            stats.clone(),
            config.room_channel_capacity,
        );

        Self {
            signaling,
            rooms,
            registry,
            stats,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    pub fn signaling(&self) -> &SignalingService {
        &self.signaling
    }

    pub fn stats(&self) -> RelayStatsSnapshot {
        self.stats.snapshot()
    }

    /// Registers a fresh connection and greets it with its id and the ICE servers.
    pub fn connect(&self, tx: mpsc::UnboundedSender<Message>) -> PeerId {
        let peer_id = PeerId::new();
        self.signaling.add_peer(peer_id, tx);
        self.signaling
            .send_signal(peer_id, SignalMessage::Welcome { peer_id });
        self.signaling.send_signal(
            peer_id,
            SignalMessage::IceConfig {
                ice_servers: self.signaling.get_ice_servers(),
            },
        );
        peer_id
    }

    pub async fn handle_message(&self, peer_id: PeerId, msg: SignalMessage) {
        match msg {
            SignalMessage::Join { role, room_id } => self.join(peer_id, role, room_id).await,

            SignalMessage::Leave { room_id } => {
                let current = self.signaling.membership(&peer_id);
                if current.as_ref().map(|(_, room)| room) != Some(&room_id) {
                    debug!(%peer_id, room = %room_id, "leave for a room the peer is not in");
                    return;
                }
                self.signaling.set_membership(&peer_id, None);
                self.leave(peer_id, &room_id).await;
            }

            SignalMessage::Signal {
                room_id,
                viewer_id,
                signal_data,
            } => {
                let joined = self
                    .signaling
                    .membership(&peer_id)
                    .is_some_and(|(_, room)| room == room_id);
                if !joined {
                    debug!(%peer_id, room = %room_id, "signal for a room the sender has not joined");
                    self.stats.record_dropped();
                    return;
                }

                let cmd = RoomCommand::Signal {
                    from: peer_id,
                    viewer_id,
                    data: signal_data,
                };
                if let Err(e) = self.rooms.dispatch_existing(&room_id, cmd).await {
                    debug!(%peer_id, "signal dropped: {}", e);
                    self.stats.record_dropped();
                }
            }

            other => warn!(%peer_id, "unexpected client message: {:?}", other),
        }
    }

    pub async fn disconnect(&self, peer_id: PeerId) {
        if let Some((_, room_id)) = self.signaling.remove_peer(&peer_id) {
            self.leave(peer_id, &room_id).await;
        }
        info!(%peer_id, "connection closed");
    }

    async fn join(&self, peer_id: PeerId, role: Role, room_id: RoomId) {
        let previous = self
            .signaling
            .set_membership(&peer_id, Some((role, room_id.clone())));

        if let Some((previous_role, previous_room)) = previous {
            if previous_role == role && previous_room == room_id {
                debug!(%peer_id, room = %room_id, "repeated join");
            } else {
                self.leave(peer_id, &previous_room).await;
            }
        }

        info!(%peer_id, %role, room = %room_id, "join");
        self.rooms
            .dispatch(&room_id, RoomCommand::Join { peer_id, role })
            .await;
    }

    async fn leave(&self, peer_id: PeerId, room_id: &RoomId) {
        let _ = self
            .rooms
            .dispatch_existing(room_id, RoomCommand::Disconnect { peer_id })
            .await;
    }
}
