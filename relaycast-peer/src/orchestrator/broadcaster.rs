use crate::error::{PeerError, TransportError};
use crate::link::{LinkCommand, LinkContext, LinkEvent, LinkEventKind, LinkHandle, LinkStart};
use crate::media::{ConnectionState, LocalMedia, MediaBackend, MediaCapture};
use crate::negotiation::NegotiationState;
use crate::signaling::SignalSink;
use relaycast_core::{IceCandidate, PeerId, Role, RoomId, SignalData, SignalMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcasterEvent {
    LinkState {
        viewer_id: PeerId,
        state: NegotiationState,
    },
    ConnectionState {
        viewer_id: PeerId,
        state: ConnectionState,
    },
    LinkFailed {
        viewer_id: PeerId,
        reason: String,
    },
    /// The relay refused to route our messages any more.
    Disconnected,
}

/// Fans one local capture out to every viewer of a room, one peer link per
/// viewer.
///
/// Links never share negotiation state: a viewer failing or leaving only
/// touches its own entry.
pub struct Broadcaster {
    room_id: RoomId,
    backend: Arc<dyn MediaBackend>,
    capture: Arc<dyn MediaCapture>,
    signaling: Arc<dyn SignalSink>,
    local_media: Option<LocalMedia>,
    links: HashMap<PeerId, LinkHandle>,
    link_events_tx: mpsc::UnboundedSender<LinkEvent>,
    link_events_rx: mpsc::UnboundedReceiver<LinkEvent>,
    events: Option<mpsc::UnboundedSender<BroadcasterEvent>>,
    next_serial: u64,
}

impl Broadcaster {
    pub fn new(
        room_id: RoomId,
        backend: Arc<dyn MediaBackend>,
        capture: Arc<dyn MediaCapture>,
        signaling: Arc<dyn SignalSink>,
    ) -> Self {
        let (link_events_tx, link_events_rx) = mpsc::unbounded_channel();
        Self {
            room_id,
            backend,
            capture,
            signaling,
            local_media: None,
            links: HashMap::new(),
            link_events_tx,
            link_events_rx,
            events: None,
            next_serial: 0,
        }
    }

    /// Starts reporting [`BroadcasterEvent`]s. A later call replaces the
    /// previous subscriber.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<BroadcasterEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Acquires the capture and claims the room.
    pub async fn start(&mut self) -> Result<(), PeerError> {
        self.local_media().await?;
        self.signaling
            .send(SignalMessage::Join {
                role: Role::Broadcaster,
                room_id: self.room_id.clone(),
            })
            .await?;
        info!("Broadcasting in room {}", self.room_id);
        Ok(())
    }

    pub fn viewer_ids(&self) -> Vec<PeerId> {
        self.links.keys().copied().collect()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link_state(&self, viewer_id: &PeerId) -> Option<NegotiationState> {
        self.links.get(viewer_id).map(LinkHandle::state)
    }

    pub fn watch_link(&self, viewer_id: &PeerId) -> Option<watch::Receiver<NegotiationState>> {
        self.links.get(viewer_id).map(LinkHandle::watch)
    }

    /// Dispatches one frame from the relay. Only a capture failure is fatal.
    pub async fn handle_signal(&mut self, msg: SignalMessage) -> Result<(), PeerError> {
        match msg {
            SignalMessage::NewViewer { viewer_id } => self.on_new_viewer(viewer_id).await?,
            SignalMessage::ViewerLeft { viewer_id } => self.on_viewer_left(viewer_id).await,
            SignalMessage::Signal {
                room_id,
                viewer_id,
                signal_data,
            } => {
                if room_id != self.room_id {
                    debug!("Ignoring signal for foreign room {}", room_id);
                    return Ok(());
                }
                let Some(viewer_id) = viewer_id else {
                    warn!("Dropping untagged {} signal", signal_data.kind());
                    return Ok(());
                };
                match signal_data {
                    SignalData::Answer { sdp } => self.on_answer(viewer_id, sdp),
                    SignalData::Candidate { candidate } => {
                        self.on_remote_candidate(viewer_id, candidate)
                    }
                    SignalData::Offer { .. } => {
                        warn!("Broadcaster received an offer from {}, ignoring", viewer_id)
                    }
                }
            }
            SignalMessage::IceConfig { ice_servers } => {
                self.backend.update_ice_servers(ice_servers);
            }
            SignalMessage::Welcome { peer_id } => debug!("Relay assigned id {}", peer_id),
            other => debug!("Broadcaster ignoring {:?}", other),
        }
        Ok(())
    }

    /// Opens a fresh link for the viewer. A viewer that already has a link is
    /// left alone.
    pub async fn on_new_viewer(&mut self, viewer_id: PeerId) -> Result<(), PeerError> {
        if self.links.contains_key(&viewer_id) {
            debug!("Viewer {} already has a link", viewer_id);
            return Ok(());
        }
        let media = self.local_media().await?;

        self.next_serial += 1;
        let ctx = LinkContext {
            serial: self.next_serial,
            room_id: self.room_id.clone(),
            viewer_id: Some(viewer_id),
            backend: self.backend.clone(),
            signaling: self.signaling.clone(),
            events: self.link_events_tx.clone(),
        };
        info!("Opening link to viewer {} in room {}", viewer_id, self.room_id);
        self.links
            .insert(viewer_id, LinkHandle::spawn(ctx, LinkStart::Offer(media)));
        Ok(())
    }

    /// No-op when the viewer has no link.
    pub fn on_answer(&mut self, viewer_id: PeerId, sdp: String) {
        match self.links.get(&viewer_id) {
            Some(link) => {
                link.send(LinkCommand::RemoteAnswer(sdp));
            }
            None => debug!("Answer from unknown viewer {}", viewer_id),
        }
    }

    pub fn on_remote_candidate(&mut self, viewer_id: PeerId, candidate: IceCandidate) {
        match self.links.get(&viewer_id) {
            Some(link) => {
                link.send(LinkCommand::RemoteCandidate(candidate));
            }
            None => debug!("Candidate from unknown viewer {}", viewer_id),
        }
    }

    pub async fn on_viewer_left(&mut self, viewer_id: PeerId) {
        if let Some(link) = self.links.remove(&viewer_id) {
            info!("Viewer {} left room {}", viewer_id, self.room_id);
            link.close().await;
            self.notify(BroadcasterEvent::LinkState {
                viewer_id,
                state: NegotiationState::Closed,
            });
        }
    }

    /// Applies one report from a link.
    pub async fn handle_link_event(&mut self, event: LinkEvent) {
        let Some(viewer_id) = event.viewer_id else {
            return;
        };
        let current = self.links.get(&viewer_id).map(LinkHandle::serial);
        if current != Some(event.serial) {
            debug!("Dropping event from stale link to {}", viewer_id);
            return;
        }

        match event.kind {
            LinkEventKind::Negotiation(state) => {
                self.notify(BroadcasterEvent::LinkState { viewer_id, state })
            }
            LinkEventKind::Connection(state) => {
                self.notify(BroadcasterEvent::ConnectionState { viewer_id, state })
            }
            LinkEventKind::Track(_) | LinkEventKind::TrackEnded(_) => {
                debug!("Ignoring inbound track event from viewer {}", viewer_id)
            }
            LinkEventKind::Failed(reason) => {
                error!("Link to viewer {} torn down: {}", viewer_id, reason);
                if let Some(link) = self.links.remove(&viewer_id) {
                    link.close().await;
                }
                self.notify(BroadcasterEvent::LinkFailed { viewer_id, reason });
            }
        }
    }

    /// Handles every link report that is already queued.
    pub async fn process_link_events(&mut self) {
        while let Ok(event) = self.link_events_rx.try_recv() {
            self.handle_link_event(event).await;
        }
    }

    /// Closes every link and leaves the room.
    pub async fn stop(&mut self) {
        for (_, link) in self.links.drain() {
            link.close().await;
        }
        let _ = self
            .signaling
            .send(SignalMessage::Leave {
                room_id: self.room_id.clone(),
            })
            .await;
    }

    /// Claims the room and serves it until the relay connection ends.
    ///
    /// Always ends in an error: either capture failed or the transport closed.
    pub async fn run(
        mut self,
        mut incoming: mpsc::UnboundedReceiver<SignalMessage>,
    ) -> Result<(), PeerError> {
        self.start().await?;
        loop {
            tokio::select! {
                msg = incoming.recv() => match msg {
                    Some(msg) => self.handle_signal(msg).await?,
                    None => break,
                },
                Some(event) = self.link_events_rx.recv() => self.handle_link_event(event).await,
            }
        }

        warn!("Relay connection lost, closing {} links", self.links.len());
        for (_, link) in self.links.drain() {
            link.close().await;
        }
        self.notify(BroadcasterEvent::Disconnected);
        Err(TransportError::Closed.into())
    }

    async fn local_media(&mut self) -> Result<LocalMedia, PeerError> {
        if let Some(media) = &self.local_media {
            return Ok(media.clone());
        }
        let media = self.capture.acquire().await.inspect_err(|e| {
            error!("Capture failed: {}", e);
        })?;
        self.local_media = Some(media.clone());
        Ok(media)
    }

    fn notify(&self, event: BroadcasterEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
