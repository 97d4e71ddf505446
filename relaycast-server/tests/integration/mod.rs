
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

use relaycast_core::{PeerId, Role, RoomId};
use relaycast_server::{RelayStats, RoomCommand, RoomManager, RoomRegistry};

use crate::utils::{MockSignalingOutput, OutboundSignal};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub struct TestRelay {
    pub rooms: RoomManager,
    pub registry: RoomRegistry,
    pub stats: Arc<RelayStats>,
    pub signaling: MockSignalingOutput,
}

impl TestRelay {
    pub async fn join(&self, room: &RoomId, peer_id: PeerId, role: Role) {
        self.rooms
            .dispatch(room, RoomCommand::Join { peer_id, role })
            .await;
    }

    pub async fn disconnect(&self, room: &RoomId, peer_id: PeerId) {
        let _ = self
            .rooms
            .dispatch_existing(room, RoomCommand::Disconnect { peer_id })
            .await;
    }
}

pub fn create_test_relay() -> (TestRelay, mpsc::UnboundedReceiver<OutboundSignal>) {
    let (signaling, signal_rx) = MockSignalingOutput::new();
    let registry = RoomRegistry::new();
    let stats = Arc::new(RelayStats::default());
    let rooms = RoomManager::new(
        Arc::new(signaling.clone()),
        registry.clone(),
        stats.clone(),
        100,
    );

    (
        TestRelay {
            rooms,
            registry,
            stats,
            signaling,
        },
        signal_rx,
    )
}
