use relaycast_core::{PeerId, Role, RoomId};

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{OutboundSignal, expect_silence, next_signal};

#[tokio::test]
async fn test_second_broadcaster_is_absorbed() {
    init_tracing();
    let (relay, mut signal_rx) = create_test_relay();
    let room = RoomId::from("42");

    let first = PeerId::new();
    let second = PeerId::new();
    relay.join(&room, first, Role::Broadcaster).await;
    relay.join(&room, second, Role::Broadcaster).await;

    let viewer = PeerId::new();
    relay.join(&room, viewer, Role::Viewer).await;

    // the viewer is introduced to the original broadcaster only
    assert_eq!(
        next_signal(&mut signal_rx).await,
        OutboundSignal::NewViewer {
            broadcaster: first,
            viewer_id: viewer
        }
    );
    expect_silence(&mut signal_rx).await;

    let record = relay.registry.get(&room).expect("room registered");
    assert_eq!(record.broadcaster_connection_id, Some(first));
}

#[tokio::test]
async fn test_broadcaster_rejoin_does_not_repeat_introductions() {
    init_tracing();
    let (relay, mut signal_rx) = create_test_relay();
    let room = RoomId::from("42");

    let broadcaster = PeerId::new();
    let viewer = PeerId::new();
    relay.join(&room, broadcaster, Role::Broadcaster).await;
    relay.join(&room, viewer, Role::Viewer).await;
    next_signal(&mut signal_rx).await;

    relay.join(&room, broadcaster, Role::Broadcaster).await;
    expect_silence(&mut signal_rx).await;
}

#[tokio::test]
async fn test_repeated_viewer_join_is_a_noop() {
    init_tracing();
    let (relay, mut signal_rx) = create_test_relay();
    let room = RoomId::from("42");

    let broadcaster = PeerId::new();
    let viewer = PeerId::new();
    relay.join(&room, broadcaster, Role::Broadcaster).await;
    relay.join(&room, viewer, Role::Viewer).await;
    relay.join(&room, viewer, Role::Viewer).await;

    assert!(matches!(
        next_signal(&mut signal_rx).await,
        OutboundSignal::NewViewer { .. }
    ));
    expect_silence(&mut signal_rx).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_broadcasters_register_once() {
    init_tracing();
    let (relay, _signal_rx) = create_test_relay();
    let room = RoomId::from("race");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let rooms = relay.rooms.clone();
        let room = room.clone();
        handles.push(tokio::spawn(async move {
            rooms
                .dispatch(
                    &room,
                    relaycast_server::RoomCommand::Join {
                        peer_id: PeerId::new(),
                        role: Role::Broadcaster,
                    },
                )
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(relay.registry.list().len(), 1);
    assert!(relay.registry.get(&room).unwrap().broadcaster_present);
}
