use relaycast_core::{IceCandidate, RoomId};
use relaycast_peer::gateway::{GatewayError, GatewayRole, GatewaySubscriber};
use relaycast_peer::{
    ConnectionState, NegotiationState, PeerError, RemoteTrack, SdpKind, SessionEvent, TrackKind,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::utils::{
    GatewayCall, MockBackend, MockGateway, SessionCall, init_tracing, wait_for_state, wait_until,
};

fn subscriber(gateway: &MockGateway, backend: &MockBackend) -> GatewaySubscriber {
    GatewaySubscriber::new(
        RoomId::from("42"),
        Arc::new(gateway.clone()),
        Arc::new(backend.clone()),
    )
}

#[tokio::test]
async fn test_answers_the_gateway_offer_and_starts() {
    init_tracing();
    let gateway = MockGateway::with_publisher(&RoomId::from("42"));
    let backend = MockBackend::new();
    let mut subscriber = subscriber(&gateway, &backend);

    subscriber.subscribe().await.unwrap();

    assert_eq!(subscriber.state(), NegotiationState::AnswerSent);
    assert_eq!(
        backend.session(0).calls(),
        vec![
            SessionCall::SetRemote(SdpKind::Offer, "gateway-offer".into()),
            SessionCall::CreateAnswer,
        ]
    );
    assert_eq!(gateway.count(|c| *c == GatewayCall::Start("answer-0".into())), 1);

    backend
        .session(0)
        .emit(SessionEvent::StateChanged(ConnectionState::Connected));
    subscriber.process_session_events().await.unwrap();
    assert_eq!(subscriber.state(), NegotiationState::Connected);
}

#[tokio::test]
async fn test_repeated_subscribe_is_success_without_a_new_link() {
    init_tracing();
    let gateway = MockGateway::with_publisher(&RoomId::from("42"));
    let backend = MockBackend::new();
    let mut subscriber = subscriber(&gateway, &backend);

    subscriber.subscribe().await.unwrap();
    subscriber.subscribe().await.unwrap();

    assert_eq!(gateway.count(|c| *c == GatewayCall::Join(GatewayRole::Subscriber)), 2);
    assert_eq!(backend.session_count(), 1);
    assert!(!backend.session(0).is_closed());
    assert_eq!(subscriber.state(), NegotiationState::AnswerSent);
}

#[tokio::test]
async fn test_empty_room_reports_no_publisher() {
    init_tracing();
    let gateway = MockGateway::new();
    let backend = MockBackend::new();
    let mut subscriber = subscriber(&gateway, &backend);

    let err = subscriber.subscribe().await.unwrap_err();

    assert!(matches!(err, PeerError::Gateway(GatewayError::NoPublisher)));
    assert_eq!(backend.session_count(), 0);
}

#[tokio::test]
async fn test_remote_tracks_land_on_one_surface() {
    init_tracing();
    let gateway = MockGateway::with_publisher(&RoomId::from("42"));
    let backend = MockBackend::new();
    let mut subscriber = subscriber(&gateway, &backend);
    subscriber.subscribe().await.unwrap();

    let session = backend.session(0);
    session.emit(SessionEvent::Track(RemoteTrack::new("a", TrackKind::Audio)));
    session.emit(SessionEvent::Track(RemoteTrack::new("v", TrackKind::Video)));
    session.emit(SessionEvent::Track(RemoteTrack::new("v", TrackKind::Video)));
    subscriber.process_session_events().await.unwrap();

    assert_eq!(
        subscriber.surface().kinds(),
        vec![TrackKind::Audio, TrackKind::Video]
    );
}

#[tokio::test]
async fn test_remote_candidates_apply_once_the_offer_is_set() {
    init_tracing();
    let gateway = MockGateway::with_publisher(&RoomId::from("42"));
    let backend = MockBackend::new();
    let mut subscriber = subscriber(&gateway, &backend);
    subscriber.subscribe().await.unwrap();

    subscriber
        .on_remote_candidate(IceCandidate::new("candidate:gw"))
        .await
        .unwrap();

    assert_eq!(backend.session(0).applied_candidates(), vec!["candidate:gw"]);
}

#[tokio::test]
async fn test_candidates_before_subscribe_are_applied_after_the_offer() {
    init_tracing();
    let gateway = MockGateway::with_publisher(&RoomId::from("42"));
    let backend = MockBackend::new();
    let mut subscriber = subscriber(&gateway, &backend);

    subscriber
        .on_remote_candidate(IceCandidate::new("candidate:early-1"))
        .await
        .unwrap();
    subscriber
        .on_remote_candidate(IceCandidate::new("candidate:early-2"))
        .await
        .unwrap();
    subscriber.subscribe().await.unwrap();

    assert_eq!(
        backend.session(0).applied_candidates(),
        vec!["candidate:early-1", "candidate:early-2"]
    );
    let calls = backend.session(0).calls();
    let offer_at = calls
        .iter()
        .position(|c| matches!(c, SessionCall::SetRemote(SdpKind::Offer, _)))
        .unwrap();
    let first_candidate_at = calls
        .iter()
        .position(|c| matches!(c, SessionCall::AddCandidate(_)))
        .unwrap();
    assert!(offer_at < first_candidate_at);
}

#[tokio::test]
async fn test_run_connects_trickles_and_stops_when_candidates_close() {
    init_tracing();
    let gateway = MockGateway::with_publisher(&RoomId::from("42"));
    let backend = MockBackend::auto_connecting();
    let mut subscriber = subscriber(&gateway, &backend);
    let state = subscriber.watch();
    let surface = subscriber.surface();

    let (candidates_tx, candidates_rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move { subscriber.run(candidates_rx).await });

    assert!(wait_for_state(state.clone(), NegotiationState::Connected).await);

    let session = backend.session(0);
    session.emit(SessionEvent::LocalCandidate(IceCandidate::new("candidate:local")));
    session.emit(SessionEvent::Track(RemoteTrack::new("v", TrackKind::Video)));
    assert!(
        wait_until(|| gateway.count(|c| *c == GatewayCall::Trickle("candidate:local".into())) == 1)
            .await
    );
    assert!(wait_until(|| surface.len() == 1).await);

    candidates_tx.send(IceCandidate::new("candidate:gw")).unwrap();
    assert!(wait_until(|| backend.session(0).applied_candidates() == vec!["candidate:gw"]).await);

    drop(candidates_tx);
    task.await.unwrap().unwrap();
    assert!(backend.session(0).is_closed());
    assert!(surface.is_empty());
    assert_eq!(*state.borrow(), NegotiationState::Closed);
}
