use crate::error::{NegotiationError, PeerError};
use crate::gateway::link::GatewayLink;
use crate::gateway::media_gateway::{GatewayError, GatewayRole, JoinRequest, MediaGateway};
use crate::media::{LocalMedia, MediaBackend, MediaCapture, SdpKind, SessionEvent};
use crate::negotiation::NegotiationState;
use relaycast_core::{IceCandidate, RoomId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// Publishes the local capture into a gateway room.
pub struct GatewayPublisher {
    room_id: RoomId,
    display: String,
    backend: Arc<dyn MediaBackend>,
    capture: Arc<dyn MediaCapture>,
    local_media: Option<LocalMedia>,
    link: GatewayLink,
}

impl GatewayPublisher {
    pub fn new(
        room_id: RoomId,
        gateway: Arc<dyn MediaGateway>,
        backend: Arc<dyn MediaBackend>,
        capture: Arc<dyn MediaCapture>,
    ) -> Self {
        Self {
            room_id,
            display: "Broadcaster".to_owned(),
            backend,
            capture,
            local_media: None,
            link: GatewayLink::new(gateway),
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = display.into();
        self
    }

    pub fn state(&self) -> NegotiationState {
        self.link.state()
    }

    pub fn watch(&self) -> watch::Receiver<NegotiationState> {
        self.link.watch()
    }

    /// Creates the room if needed, joins it and publishes.
    ///
    /// Safe to call again: the room is never created twice and a live
    /// publication is left as it is.
    pub async fn start(&mut self) -> Result<(), PeerError> {
        if !matches!(
            self.link.state(),
            NegotiationState::Idle | NegotiationState::Closed
        ) {
            debug!("Already publishing to room {}", self.room_id);
            return Ok(());
        }

        let media = self.local_media().await?;
        let attachment = self.link.attach().await?;

        match self.link.gateway.create_room(attachment, &self.room_id).await {
            Ok(()) => info!("Created gateway room {}", self.room_id),
            Err(GatewayError::AlreadyExists) => debug!("Gateway room {} already exists", self.room_id),
            Err(e) => return Err(e.into()),
        }

        let request = JoinRequest {
            room: self.room_id.clone(),
            role: GatewayRole::Publisher,
            display: self.display.clone(),
            feed: None,
        };
        match self.link.gateway.join(attachment, request).await {
            Ok(_) | Err(GatewayError::AlreadyJoined) => {}
            Err(e) => return Err(e.into()),
        }

        if let Err(e) = self.negotiate(media).await {
            error!("Publishing to room {} failed: {}", self.room_id, e);
            self.link.close().await;
            return Err(e);
        }
        info!("Publishing to gateway room {}", self.room_id);
        Ok(())
    }

    pub async fn on_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.link.remote_candidate(candidate).await
    }

    /// Trickles queued local candidates and returns the remaining session
    /// events.
    pub async fn process_session_events(&mut self) -> Result<Vec<SessionEvent>, PeerError> {
        self.link.drain_events().await
    }

    pub async fn stop(&mut self) {
        self.link.close().await;
    }

    /// Publishes, then keeps the session going: remote candidates from
    /// `candidates` are applied and local ones trickled to the gateway.
    /// Closing `candidates` ends the publication.
    pub async fn run(
        &mut self,
        mut candidates: mpsc::UnboundedReceiver<IceCandidate>,
    ) -> Result<(), PeerError> {
        self.start().await?;
        let result = self.drive(&mut candidates).await;
        self.stop().await;
        info!("Stopped publishing to room {}", self.room_id);
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
                        debug!("Publisher session event: {:?}", event);
                    }
                }
            }
        }
    }

    async fn negotiate(&mut self, media: LocalMedia) -> Result<(), PeerError> {
        let session = self.link.open(self.backend.as_ref()).await?;
        let attachment = self.link.attach().await?;

        session
            .attach_tracks(&media)
            .await
            .map_err(NegotiationError::from)?;
        let offer = session.create_offer().await.map_err(NegotiationError::from)?;
        self.link.negotiation.offer_sent()?;
        self.link.publish();

        let answer = self.link.gateway.publish(attachment, offer).await?;
        session
            .set_remote_description(SdpKind::Answer, answer)
            .await
            .map_err(NegotiationError::from)?;
        let pending = self.link.negotiation.answer_received()?;
        self.link.publish();
        self.link.apply_candidates(pending).await?;
        self.link.negotiation.connected()?;
        self.link.publish();
        Ok(())
    }

    async fn local_media(&mut self) -> Result<LocalMedia, PeerError> {
        if let Some(media) = &self.local_media {
            return Ok(media.clone());
        }
        let media = self.capture.acquire().await?;
        self.local_media = Some(media.clone());
        Ok(media)
    }
}
