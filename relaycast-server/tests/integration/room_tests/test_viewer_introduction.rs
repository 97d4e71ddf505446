use relaycast_core::{PeerId, Role, RoomId};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{OutboundSignal, expect_silence, next_signal};

#[tokio::test]
async fn test_viewer_after_broadcaster_is_introduced() {
    init_tracing();
    let (relay, mut signal_rx) = create_test_relay();
    let room = RoomId::from("42");

    let broadcaster = PeerId::new();
    let viewer = PeerId::new();

    relay.join(&room, broadcaster, Role::Broadcaster).await;
    relay.join(&room, viewer, Role::Viewer).await;

    assert_eq!(
        next_signal(&mut signal_rx).await,
        OutboundSignal::NewViewer {
            broadcaster,
            viewer_id: viewer
        }
    );
    expect_silence(&mut signal_rx).await;
    assert!(relay.registry.is_broadcasting(&room));
}

#[tokio::test]
async fn test_waiting_viewers_are_introduced_in_join_order() {
    init_tracing();
    let (relay, mut signal_rx) = create_test_relay();
    let room = RoomId::from("42");

    let v1 = PeerId::new();
    let v2 = PeerId::new();
    relay.join(&room, v1, Role::Viewer).await;
    relay.join(&room, v2, Role::Viewer).await;

    expect_silence(&mut signal_rx).await;
    assert!(!relay.registry.is_broadcasting(&room));

    let broadcaster = PeerId::new();
    relay.join(&room, broadcaster, Role::Broadcaster).await;

    let expected = [
        OutboundSignal::NewBroadcaster {
            viewer: v1,
            room_id: room.clone(),
        },
        OutboundSignal::NewViewer {
            broadcaster,
            viewer_id: v1,
        },
        OutboundSignal::NewBroadcaster {
            viewer: v2,
            room_id: room.clone(),
        },
        OutboundSignal::NewViewer {
            broadcaster,
            viewer_id: v2,
        },
    ];
    for want in expected {
        assert_eq!(next_signal(&mut signal_rx).await, want);
    }
    expect_silence(&mut signal_rx).await;
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    init_tracing();
    let (relay, mut signal_rx) = create_test_relay();

    let b1 = PeerId::new();
    let b2 = PeerId::new();
    let viewer = PeerId::new();

    relay.join(&RoomId::from("1"), b1, Role::Broadcaster).await;
    relay.join(&RoomId::from("2"), b2, Role::Broadcaster).await;
    relay.join(&RoomId::from("2"), viewer, Role::Viewer).await;

    assert_eq!(
        next_signal(&mut signal_rx).await,
        OutboundSignal::NewViewer {
            broadcaster: b2,
            viewer_id: viewer
        }
    );
    expect_silence(&mut signal_rx).await;
    assert!(relay.signaling.sent_to(&b1).await.is_empty());
}
