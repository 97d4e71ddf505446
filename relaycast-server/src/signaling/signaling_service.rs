use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use relaycast_core::{IceServerConfig, PeerId, Role, RoomId, SignalData, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

struct Connection {
    tx: mpsc::UnboundedSender<Message>,
    membership: Option<(Role, RoomId)>,
}

struct SignalingInner {
    peers: DashMap<PeerId, Connection>,
    ice_servers: Vec<IceServerConfig>,
}

/// Table of live websocket connections and their declared role and room.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn get_ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(
            peer_id,
            Connection {
                tx,
                membership: None,
            },
        );
    }

    /// Forgets the connection and returns the room it was in, if any.
    pub fn remove_peer(&self, peer_id: &PeerId) -> Option<(Role, RoomId)> {
        self.inner
            .peers
            .remove(peer_id)
            .and_then(|(_, connection)| connection.membership)
    }

    pub fn membership(&self, peer_id: &PeerId) -> Option<(Role, RoomId)> {
        self.inner
            .peers
            .get(peer_id)
            .and_then(|connection| connection.membership.clone())
    }

    /// Records the new membership and returns the previous one.
    pub fn set_membership(
        &self,
        peer_id: &PeerId,
        membership: Option<(Role, RoomId)>,
    ) -> Option<(Role, RoomId)> {
        let mut connection = self.inner.peers.get_mut(peer_id)?;
        std::mem::replace(&mut connection.membership, membership)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.peers.len()
    }

    pub fn send_signal(&self, peer_id: PeerId, msg: SignalMessage) {
        if let Some(peer) = self.inner.peers.get(&peer_id) {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if let Err(e) = peer.tx.send(Message::Text(json.into())) {
                        error!("Failed to send WS message to {}: {:?}", peer_id, e);
                    }
                }
                Err(e) => error!("Failed to serialize signal message: {}", e),
            }
        } else {
            warn!("Attempted to send signal to disconnected peer {}", peer_id);
        }
    }
}

#[async_trait]
impl SignalingOutput for SignalingService {
    async fn send_new_viewer(&self, broadcaster: PeerId, viewer_id: PeerId) {
        self.send_signal(broadcaster, SignalMessage::NewViewer { viewer_id });
    }

    async fn send_new_broadcaster(&self, viewer: PeerId, room_id: RoomId) {
        self.send_signal(viewer, SignalMessage::NewBroadcaster { room_id });
    }

    async fn send_viewer_left(&self, broadcaster: PeerId, viewer_id: PeerId) {
        self.send_signal(broadcaster, SignalMessage::ViewerLeft { viewer_id });
    }

    async fn send_broadcaster_left(&self, viewer: PeerId, room_id: RoomId) {
        self.send_signal(viewer, SignalMessage::BroadcasterLeft { room_id });
    }

    async fn relay_signal(&self, to: PeerId, room_id: RoomId, viewer_id: PeerId, data: SignalData) {
        self.send_signal(to, SignalMessage::signal(room_id, Some(viewer_id), data));
    }
}
