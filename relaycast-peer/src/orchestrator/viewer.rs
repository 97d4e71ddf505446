use crate::error::{PeerError, TransportError};
use crate::link::{LinkCommand, LinkContext, LinkEvent, LinkEventKind, LinkHandle, LinkStart};
use crate::media::{ConnectionState, MediaBackend, MediaSurface, RemoteTrack, TrackKind};
use crate::negotiation::NegotiationState;
use crate::signaling::SignalSink;
use relaycast_core::{IceCandidate, PeerId, Role, RoomId, SignalData, SignalMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    /// A broadcaster showed up, an offer should follow.
    BroadcasterAvailable,
    LinkState(NegotiationState),
    ConnectionState(ConnectionState),
    TrackAdded { id: String, kind: TrackKind },
    TrackEnded { id: String },
    LinkFailed(String),
    /// The broadcaster is gone. Waiting for the next one.
    Idle,
    Disconnected,
}

/// Receives a room's broadcast over a single peer link and collects the
/// incoming tracks on one [`MediaSurface`].
pub struct Viewer {
    room_id: RoomId,
    peer_id: Option<PeerId>,
    backend: Arc<dyn MediaBackend>,
    signaling: Arc<dyn SignalSink>,
    link: Option<LinkHandle>,
    surface: MediaSurface,
    link_events_tx: mpsc::UnboundedSender<LinkEvent>,
    link_events_rx: mpsc::UnboundedReceiver<LinkEvent>,
    events: Option<mpsc::UnboundedSender<ViewerEvent>>,
    next_serial: u64,
}

impl Viewer {
    pub fn new(
        room_id: RoomId,
        backend: Arc<dyn MediaBackend>,
        signaling: Arc<dyn SignalSink>,
    ) -> Self {
        let (link_events_tx, link_events_rx) = mpsc::unbounded_channel();
        Self {
            room_id,
            peer_id: None,
            backend,
            signaling,
            link: None,
            surface: MediaSurface::new(),
            link_events_tx,
            link_events_rx,
            events: None,
            next_serial: 0,
        }
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ViewerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Id the relay assigned to this connection, once known.
    pub fn peer_id(&self) -> Option<PeerId> {
        self.peer_id
    }

    /// The playable surface. The same instance lives as long as the viewer.
    pub fn surface(&self) -> MediaSurface {
        self.surface.clone()
    }

    pub fn link_state(&self) -> Option<NegotiationState> {
        self.link.as_ref().map(LinkHandle::state)
    }

    pub fn watch_link(&self) -> Option<watch::Receiver<NegotiationState>> {
        self.link.as_ref().map(LinkHandle::watch)
    }

    pub async fn start(&mut self) -> Result<(), PeerError> {
        self.signaling
            .send(SignalMessage::Join {
                role: Role::Viewer,
                room_id: self.room_id.clone(),
            })
            .await?;
        info!("Watching room {}", self.room_id);
        Ok(())
    }

    pub async fn handle_signal(&mut self, msg: SignalMessage) {
        match msg {
            SignalMessage::Welcome { peer_id } => {
                debug!("Relay assigned id {}", peer_id);
                self.peer_id = Some(peer_id);
            }
            SignalMessage::IceConfig { ice_servers } => {
                self.backend.update_ice_servers(ice_servers);
            }
            SignalMessage::Signal {
                room_id,
                viewer_id,
                signal_data,
            } => {
                if room_id != self.room_id {
                    debug!("Ignoring signal for foreign room {}", room_id);
                    return;
                }
                if let (Some(tagged), Some(own)) = (viewer_id, self.peer_id)
                    && tagged != own
                {
                    warn!("Dropping {} addressed to {}", signal_data.kind(), tagged);
                    return;
                }
                match signal_data {
                    SignalData::Offer { sdp } => self.on_offer(sdp).await,
                    SignalData::Candidate { candidate } => self.on_remote_candidate(candidate),
                    SignalData::Answer { .. } => warn!("Viewer received an answer, ignoring"),
                }
            }
            SignalMessage::NewBroadcaster { room_id } => {
                info!("Broadcaster arrived in room {}", room_id);
                self.notify(ViewerEvent::BroadcasterAvailable);
            }
            SignalMessage::BroadcasterLeft { .. } => self.on_no_broadcaster().await,
            other => debug!("Viewer ignoring {:?}", other),
        }
    }

    /// Answers a fresh offer. Any previous link is discarded first.
    pub async fn on_offer(&mut self, sdp: String) {
        if let Some(stale) = self.link.take() {
            debug!("Replacing link {} with a fresh one", stale.serial());
            stale.close().await;
            self.surface.clear();
        }

        self.next_serial += 1;
        let ctx = LinkContext {
            serial: self.next_serial,
            room_id: self.room_id.clone(),
            viewer_id: None,
            backend: self.backend.clone(),
            signaling: self.signaling.clone(),
            events: self.link_events_tx.clone(),
        };
        self.link = Some(LinkHandle::spawn(ctx, LinkStart::Answer(sdp)));
    }

    pub fn on_remote_candidate(&mut self, candidate: IceCandidate) {
        match &self.link {
            Some(link) => {
                link.send(LinkCommand::RemoteCandidate(candidate));
            }
            None => debug!("Candidate arrived with no link, dropping"),
        }
    }

    pub fn on_track_received(&mut self, track: RemoteTrack) {
        let (id, kind) = (track.id.clone(), track.kind);
        if self.surface.add_track(track) {
            info!("Playing {:?} track {}", kind, id);
            self.notify(ViewerEvent::TrackAdded { id, kind });
        } else {
            debug!("Track {} already on the surface", id);
        }
    }

    pub fn on_track_ended(&mut self, id: &str) {
        if self.surface.remove_track(id) {
            debug!("Track {} ended", id);
            self.notify(ViewerEvent::TrackEnded { id: id.to_owned() });
        }
    }

    pub async fn on_no_broadcaster(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
        self.surface.clear();
        info!("Broadcaster left room {}, waiting", self.room_id);
        self.notify(ViewerEvent::Idle);
    }

    pub async fn handle_link_event(&mut self, event: LinkEvent) {
        let current = self.link.as_ref().map(LinkHandle::serial);
        if current != Some(event.serial) {
            debug!("Dropping event from stale link {}", event.serial);
            return;
        }

        match event.kind {
            LinkEventKind::Negotiation(state) => self.notify(ViewerEvent::LinkState(state)),
            LinkEventKind::Connection(state) => self.notify(ViewerEvent::ConnectionState(state)),
            LinkEventKind::Track(track) => self.on_track_received(track),
            LinkEventKind::TrackEnded(id) => self.on_track_ended(&id),
            LinkEventKind::Failed(reason) => {
                error!("Link to broadcaster torn down: {}", reason);
                if let Some(link) = self.link.take() {
                    link.close().await;
                }
                self.surface.clear();
                self.notify(ViewerEvent::LinkFailed(reason));
            }
        }
    }

    pub async fn process_link_events(&mut self) {
        while let Ok(event) = self.link_events_rx.try_recv() {
            self.handle_link_event(event).await;
        }
    }

    pub async fn stop(&mut self) {
        if let Some(link) = self.link.take() {
            link.close().await;
        }
        self.surface.clear();
        let _ = self
            .signaling
            .send(SignalMessage::Leave {
                room_id: self.room_id.clone(),
            })
            .await;
    }

    /// Joins the room and follows it until the relay connection ends.
    pub async fn run(
        mut self,
        mut incoming: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> Result<(), PeerError> {
        self.start().await?;
        loop {
            tokio::select! {
                msg = incoming.recv() => match msg {
                    Some(msg) => self.handle_signal(msg).await,
                    None => break,
                },
                Some(event) = self.link_events_rx.recv() => self.handle_link_event(event).await,
            }
        }

        warn!("Relay connection lost");
        if let Some(link) = self.link.take() {
            link.close().await;
        }
        self.surface.clear();
        self.notify(ViewerEvent::Disconnected);
        Err(TransportError::Closed.into())
    }

    fn notify(&self, event: ViewerEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
