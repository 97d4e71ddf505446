use crate::error::{NegotiationError, PeerError};
use crate::gateway::link::GatewayLink;
use crate::gateway::media_gateway::{GatewayError, GatewayRole, JoinRequest, MediaGateway};
use crate::media::{MediaBackend, MediaSurface, SdpKind, SessionEvent};
use crate::negotiation::NegotiationState;
use relaycast_core::{IceCandidate, RoomId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Watches the first publisher of a gateway room.
pub struct GatewaySubscriber {
    room_id: RoomId,
    display: String,
    backend: Arc<dyn MediaBackend>,
    surface: MediaSurface,
    link: GatewayLink,
}

impl GatewaySubscriber {
    pub fn new(
        room_id: RoomId,
        gateway: Arc<dyn MediaGateway>,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        Self {
            room_id,
            display: "Viewer".to_owned(),
            backend,
            surface: MediaSurface::new(),
            link: GatewayLink::new(gateway),
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.link.state()
    }

    pub fn watch(&self) -> watch::Receiver<NegotiationState> {
        self.link.watch()
    }

    pub fn surface(&self) -> MediaSurface {
        self.surface.clone()
    }

    /// Subscribes to the room's publisher. A subscription the gateway
    /// already knows about counts as success and keeps the current link.
    pub async fn subscribe(&mut self) -> Result<(), PeerError> {
        let attachment = self.link.attach().await?;
        let feeds = self
            .link
            .gateway
            .list_publishers(attachment, &self.room_id)
            .await?;
        let feed = feeds.first().copied().ok_or(GatewayError::NoPublisher)?;

        let request = JoinRequest {
            room: self.room_id.clone(),
            role: GatewayRole::Subscriber,
            display: self.display.clone(),
            feed: Some(feed),
        };
        let offer = match self.link.gateway.join(attachment, request).await {
            Ok(Some(offer)) => offer,
            Ok(None) => return Err(GatewayError::MissingOffer.into()),
            Err(GatewayError::AlreadyJoined) => {
                info!("Already subscribed to room {}", self.room_id);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.negotiate(offer).await {
            error!("Subscribing to room {} failed: {}", self.room_id, e);
            self.link.close().await;
            self.surface.clear();
            return Err(e);
        }
        info!("Subscribed to feed {:?} in room {}", feed, self.room_id);
        Ok(())
    }

    pub async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.link.remote_candidate(candidate).await
    }

    /// Trickles local candidates and moves received tracks onto the surface.
    pub async fn process_session_events(&mut self) -> Result<(), PeerError> {
        for event in self.link.drain_events().await? {
            self.on_session_event(event);
        }
        Ok(())
    }

    /// Subscribes, then keeps the session going until `candidates` closes.
    /// Tracks land on [`GatewaySubscriber::surface`] as they arrive.
    pub async fn run(
        &mut self,
        mut candidates: mpsc::UnboundedReceiver<IceCandidate>,
    ) -> Result<(), PeerError> {
        self.subscribe().await?;
        let result = self.drive(&mut candidates).await;
        self.stop().await;
        info!("Left gateway room {}", self.room_id);
        result
    }

    async fn drive(
        &mut self,
        candidates: &mut mpsc::UnboundedReceiver<IceCandidate>,
    ) -> Result<(), PeerError> {
        loop {
            tokio::select! {
                candidate = candidates.recv() => match candidate {
                    Some(candidate) => self.on_remote_candidate(candidate).await?,
                    None => return Ok(()),
                },
                event = self.link.next_event() => {
                    if let Some(event) = self.link.handle_event(event).await? {
                        self.on_session_event(event);
                    }
                }
            }
        }
    }

    fn on_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Track(track) => {
                let id = track.id.clone();
                if !self.surface.add_track(track) {
                    debug!("Track {} already on the surface", id);
                }
            }
            SessionEvent::TrackEnded(id) => {
                self.surface.remove_track(&id);
            }
            SessionEvent::StateChanged(state) => debug!("Gateway session {:?}", state),
            SessionEvent::LocalCandidate(_) => {}
        }
    }

    pub async fn stop(&mut self) {
        self.link.close().await;
        self.surface.clear();
    }

    async fn negotiate(&mut self, offer: String) -> Result<(), PeerError> {
        self.surface.clear();
        let session = self.link.open(self.backend.as_ref()).await?;
        let attachment = self.link.attach().await?;

        self.link
            .negotiation
            .expect(NegotiationState::Idle, "offer received")?;
        session
            .set_remote_description(SdpKind::Offer, offer)
            .await
            .map_err(NegotiationError::from)?;
        let pending = self.link.negotiation.offer_received()?;
        self.link.publish();
        self.link.apply_candidates(pending).await?;

        let answer = session.create_answer().await.map_err(NegotiationError::from)?;
        self.link.negotiation.answer_sent()?;
        self.link.publish();
        self.link.gateway.start(attachment, answer).await?;
        Ok(())
    }
}
