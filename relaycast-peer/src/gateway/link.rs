use crate::error::{NegotiationError, PeerError};
use crate::gateway::media_gateway::{Attachment, MediaGateway};
use crate::media::{ConnectionState, MediaBackend, MediaSession, SessionEvent};
use crate::negotiation::{Negotiation, NegotiationState};
use relaycast_core::IceCandidate;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// The single session a gateway client keeps with the gateway, plus the
/// gateway session and handle it negotiates through.
pub(crate) struct GatewayLink {
    pub gateway: Arc<dyn MediaGateway>,
    attachment: Option<Attachment>,
    pub negotiation: Negotiation,
    session: Option<Arc<dyn MediaSession>>,
    session_events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    state: watch::Sender<NegotiationState>,
}

impl GatewayLink {
    pub fn new(gateway: Arc<dyn MediaGateway>) -> Self {
        let (state, _) = watch::channel(NegotiationState::Idle);
        Self {
            gateway,
            attachment: None,
            negotiation: Negotiation::new(),
            session: None,
            session_events: None,
            state,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.negotiation.state()
    }

    pub fn watch(&self) -> watch::Receiver<NegotiationState> {
        self.state.subscribe()
    }

    /// Session and handle are created on first use and kept afterwards.
    pub async fn attach(&mut self) -> Result<Attachment, PeerError> {
        if let Some(attachment) = self.attachment {
            return Ok(attachment);
        }
        let session = self.gateway.create_session().await?;
        let handle = self.gateway.attach(session).await?;
        let attachment = Attachment { session, handle };
        debug!("Attached to gateway: {:?}", attachment);
        self.attachment = Some(attachment);
        Ok(attachment)
    }

    /// Opens a fresh media session and restarts the negotiation. Candidates
    /// that arrived before it stay buffered for the new exchange.
    pub async fn open(
        &mut self,
        backend: &dyn MediaBackend,
    ) -> Result<Arc<dyn MediaSession>, PeerError> {
        self.close().await;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = backend
            .open_session(events_tx)
            .await
            .map_err(NegotiationError::from)?;
        self.negotiation.restart();
        self.publish();
        self.session = Some(session.clone());
        self.session_events = Some(events_rx);
        Ok(session)
    }

    pub fn publish(&self) {
        self.state.send_replace(self.negotiation.state());
    }

    pub async fn apply_candidates(&self, candidates: Vec<IceCandidate>) -> Result<(), PeerError> {
        let Some(session) = &self.session else {
            return Err(NegotiationError::Closed.into());
        };
        for candidate in candidates {
            session
                .add_ice_candidate(candidate)
                .await
                .map_err(NegotiationError::from)?;
        }
        Ok(())
    }

    pub async fn remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        match self.negotiation.remote_candidate(candidate)? {
            Some(candidate) => self.apply_candidates(vec![candidate]).await,
            None => {
                debug!(
                    "Buffered remote candidate ({} waiting)",
                    self.negotiation.buffered_candidates()
                );
                Ok(())
            }
        }
    }

    /// Waits for the next session event. Never resolves without a session.
    pub async fn next_event(&mut self) -> SessionEvent {
        if let Some(events) = &mut self.session_events {
            if let Some(event) = events.recv().await {
                return event;
            }
            self.session_events = None;
        }
        std::future::pending().await
    }

    /// Local candidates are trickled to the gateway and consumed, anything
    /// else is handed back.
    pub async fn handle_event(
        &mut self,
        event: SessionEvent,
    ) -> Result<Option<SessionEvent>, PeerError> {
        match event {
            SessionEvent::LocalCandidate(candidate) => {
                let attachment = self.attach().await?;
                self.gateway.trickle(attachment, candidate).await?;
                Ok(None)
            }
            SessionEvent::StateChanged(ConnectionState::Connected)
                if self.negotiation.state() == NegotiationState::AnswerSent =>
            {
                self.negotiation.connected()?;
                self.publish();
                Ok(Some(event))
            }
            other => Ok(Some(other)),
        }
    }

    /// Handles every queued session event and returns the ones left over.
    pub async fn drain_events(&mut self) -> Result<Vec<SessionEvent>, PeerError> {
        let mut pending = Vec::new();
        if let Some(events) = &mut self.session_events {
            while let Ok(event) = events.try_recv() {
                pending.push(event);
            }
        }

        let mut rest = Vec::new();
        for event in pending {
            if let Some(event) = self.handle_event(event).await? {
                rest.push(event);
            }
        }
        Ok(rest)
    }

    pub async fn close(&mut self) {
        if let Some(session) = self.session.take()
            && let Err(e) = session.close().await
        {
            warn!("Failed to close gateway media session: {:#}", e);
        }
        self.session_events = None;
        if self.negotiation.state() != NegotiationState::Idle {
            self.negotiation.close();
            self.publish();
        }
    }
}
