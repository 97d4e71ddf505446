use relaycast_core::{PeerId, RoomId, SignalData, SignalMessage};
use relaycast_peer::{RemoteTrack, SessionEvent, TrackKind, ViewerEvent};

use crate::integration::create_viewer;
use crate::utils::{MockBackend, init_tracing, next_signal, pump_viewer_until};

#[tokio::test]
async fn test_audio_then_video_accumulate_on_one_surface() {
    init_tracing();
    let mut t = create_viewer("42", MockBackend::new());
    let mut events = t.viewer.subscribe();
    let surface = t.viewer.surface();

    t.viewer
        .handle_signal(SignalMessage::signal(
            RoomId::from("42"),
            Some(PeerId::new()),
            SignalData::Offer {
                sdp: "remote-offer".into(),
            },
        ))
        .await;
    next_signal(&mut t.sent).await;

    let session = t.backend.session(0);
    session.emit(SessionEvent::Track(RemoteTrack::new("audio-1", TrackKind::Audio)));
    session.emit(SessionEvent::Track(RemoteTrack::new("video-1", TrackKind::Video)));
    session.emit(SessionEvent::Track(RemoteTrack::new("video-1", TrackKind::Video)));

    assert!(pump_viewer_until(&mut t.viewer, |v| v.surface().len() == 2).await);
    assert_eq!(surface.kinds(), vec![TrackKind::Audio, TrackKind::Video]);

    let mut added = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ViewerEvent::TrackAdded { id, .. } = event {
            added.push(id);
        }
    }
    assert_eq!(added, vec!["audio-1", "video-1"]);

    session.emit(SessionEvent::TrackEnded("audio-1".into()));
    assert!(pump_viewer_until(&mut t.viewer, |v| v.surface().len() == 1).await);
    assert_eq!(surface.kinds(), vec![TrackKind::Video]);
}

#[tokio::test]
async fn test_tracks_from_a_replaced_link_are_ignored() {
    init_tracing();
    let mut t = create_viewer("42", MockBackend::new());
    let room = RoomId::from("42");

    for sdp in ["first-offer", "second-offer"] {
        t.viewer
            .handle_signal(SignalMessage::signal(
                room.clone(),
                None,
                SignalData::Offer { sdp: sdp.into() },
            ))
            .await;
        next_signal(&mut t.sent).await;
    }

    t.backend
        .session(0)
        .emit(SessionEvent::Track(RemoteTrack::new("stale", TrackKind::Video)));
    t.backend
        .session(1)
        .emit(SessionEvent::Track(RemoteTrack::new("fresh", TrackKind::Video)));

    assert!(pump_viewer_until(&mut t.viewer, |v| !v.surface().is_empty()).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    t.viewer.process_link_events().await;

    let ids: Vec<_> = t.viewer.surface().tracks().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["fresh"]);
}
