use crate::error::NegotiationError;
use crate::media::{ConnectionState, LocalMedia, MediaBackend, MediaSession, RemoteTrack, SdpKind, SessionEvent};
use crate::negotiation::{Negotiation, NegotiationState};
use crate::signaling::SignalSink;
use relaycast_core::{IceCandidate, PeerId, RoomId, SignalData, SignalMessage};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type SessionSlot = Arc<Mutex<Option<Arc<dyn MediaSession>>>>;

pub(crate) enum LinkCommand {
    RemoteAnswer(String),
    RemoteCandidate(IceCandidate),
}

pub(crate) enum LinkStart {
    /// Attach the capture and send an offer.
    Offer(LocalMedia),
    /// Answer the given remote offer.
    Answer(String),
}

#[derive(Debug, Clone)]
pub enum LinkEventKind {
    Negotiation(NegotiationState),
    Connection(ConnectionState),
    Track(RemoteTrack),
    TrackEnded(String),
    Failed(String),
}

/// Something a link reports to its orchestrator. `serial` tells apart a live
/// link from one that has already been replaced.
#[derive(Debug, Clone)]
pub struct LinkEvent {
    pub serial: u64,
    pub viewer_id: Option<PeerId>,
    pub kind: LinkEventKind,
}

pub(crate) struct LinkContext {
    pub serial: u64,
    pub room_id: RoomId,
    /// Tag for outgoing signals. Set on the broadcaster side only.
    pub viewer_id: Option<PeerId>,
    pub backend: Arc<dyn MediaBackend>,
    pub signaling: Arc<dyn SignalSink>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
}

/// Owner's side of a running peer link.
pub struct LinkHandle {
    serial: u64,
    viewer_id: Option<PeerId>,
    commands: mpsc::UnboundedSender<LinkCommand>,
    state: Arc<watch::Sender<NegotiationState>>,
    session: SessionSlot,
    task: JoinHandle<()>,
}

impl LinkHandle {
    pub(crate) fn spawn(ctx: LinkContext, start: LinkStart) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(NegotiationState::Idle);
        let state = Arc::new(state_tx);
        let session: SessionSlot = Arc::new(Mutex::new(None));

        let serial = ctx.serial;
        let viewer_id = ctx.viewer_id;
        let link = PeerLink {
            ctx,
            negotiation: Negotiation::new(),
            state: state.clone(),
            session_slot: session.clone(),
            commands: command_rx,
        };
        let task = tokio::spawn(link.run(start));

        Self {
            serial,
            viewer_id,
            commands: command_tx,
            state,
            session,
            task,
        }
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn viewer_id(&self) -> Option<PeerId> {
        self.viewer_id
    }

    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<NegotiationState> {
        self.state.subscribe()
    }

    pub(crate) fn send(&self, command: LinkCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Stops the link wherever it is and releases its session.
    pub async fn close(self) {
        self.task.abort();
        let session = take_session(&self.session);
        if let Some(session) = session
            && let Err(e) = session.close().await
        {
            warn!("Failed to close media session: {:#}", e);
        }
        self.state.send_replace(NegotiationState::Closed);
    }
}

fn take_session(slot: &SessionSlot) -> Option<Arc<dyn MediaSession>> {
    slot.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

/// One offer/answer exchange with one remote peer, driven to completion
/// inside its own task. Commands are handled strictly one at a time.
struct PeerLink {
    ctx: LinkContext,
    negotiation: Negotiation,
    state: Arc<watch::Sender<NegotiationState>>,
    session_slot: SessionSlot,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
}

impl fmt::Display for PeerLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.viewer_id {
            Some(viewer_id) => write!(f, "{}/{}", self.ctx.room_id, viewer_id),
            None => write!(f, "{}/broadcaster", self.ctx.room_id),
        }
    }
}

impl PeerLink {
    async fn run(mut self, start: LinkStart) {
        let (session_tx, mut session_rx) = mpsc::unbounded_channel();
        let session = match self.ctx.backend.open_session(session_tx).await {
            Ok(session) => session,
            Err(e) => {
                self.fail(None, e.into()).await;
                return;
            }
        };
        *self
            .session_slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());

        let started = match start {
            LinkStart::Offer(media) => self.start_offer(&session, &media).await,
            LinkStart::Answer(sdp) => self.start_answer(&session, sdp).await,
        };
        if let Err(e) = started {
            self.fail(Some(&session), e).await;
            return;
        }

        loop {
            let result = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(&session, cmd).await,
                    None => break,
                },
                Some(event) = session_rx.recv() => self.handle_session_event(event).await,
            };
            if let Err(e) = result {
                self.fail(Some(&session), e).await;
                return;
            }
        }

        debug!("Peer link {} released by its owner", self);
        self.negotiation.close();
        self.publish();
        take_session(&self.session_slot);
        if let Err(e) = session.close().await {
            warn!("Failed to close media session for {}: {:#}", self, e);
        }
    }

    async fn start_offer(
        &mut self,
        session: &Arc<dyn MediaSession>,
        media: &LocalMedia,
    ) -> Result<(), NegotiationError> {
        session.attach_tracks(media).await?;
        let sdp = session.create_offer().await?;
        self.negotiation.offer_sent()?;
        self.publish();
        self.signal(SignalData::Offer { sdp }).await?;
        info!("Offer sent on {}", self);
        Ok(())
    }

    async fn start_answer(
        &mut self,
        session: &Arc<dyn MediaSession>,
        offer: String,
    ) -> Result<(), NegotiationError> {
        self.negotiation.expect(NegotiationState::Idle, "offer received")?;
        session
            .set_remote_description(SdpKind::Offer, offer)
            .await?;
        let pending = self.negotiation.offer_received()?;
        self.publish();
        apply_candidates(session, pending).await?;

        let sdp = session.create_answer().await?;
        self.negotiation.answer_sent()?;
        self.publish();
        self.signal(SignalData::Answer { sdp }).await?;
        info!("Answer sent on {}", self);
        Ok(())
    }

    async fn handle_command(
        &mut self,
        session: &Arc<dyn MediaSession>,
        command: LinkCommand,
    ) -> Result<(), NegotiationError> {
        match command {
            LinkCommand::RemoteAnswer(sdp) => {
                if let Err(e) = self
                    .negotiation
                    .expect(NegotiationState::OfferSent, "answer received")
                {
                    warn!("Ignoring answer on {}: {}", self, e);
                    return Ok(());
                }
                session
                    .set_remote_description(SdpKind::Answer, sdp)
                    .await?;
                let pending = self.negotiation.answer_received()?;
                self.publish();
                apply_candidates(session, pending).await?;
                self.negotiation.connected()?;
                self.publish();
                info!("Peer link {} connected", self);
            }
            LinkCommand::RemoteCandidate(candidate) => {
                match self.negotiation.remote_candidate(candidate)? {
                    Some(candidate) => session.add_ice_candidate(candidate).await?,
                    None => debug!(
                        "Buffered remote candidate on {} ({} pending)",
                        self,
                        self.negotiation.buffered_candidates()
                    ),
                }
            }
        }
        Ok(())
    }

    async fn handle_session_event(&mut self, event: SessionEvent) -> Result<(), NegotiationError> {
        match event {
            SessionEvent::LocalCandidate(candidate) => {
                self.signal(SignalData::Candidate { candidate }).await?;
            }
            SessionEvent::Track(track) => self.emit(LinkEventKind::Track(track)),
            SessionEvent::TrackEnded(id) => self.emit(LinkEventKind::TrackEnded(id)),
            SessionEvent::StateChanged(state) => {
                if state == ConnectionState::Connected
                    && self.negotiation.state() == NegotiationState::AnswerSent
                {
                    self.negotiation.connected()?;
                    self.publish();
                }
                self.emit(LinkEventKind::Connection(state));
            }
        }
        Ok(())
    }

    async fn signal(&self, data: SignalData) -> Result<(), NegotiationError> {
        let msg = SignalMessage::signal(self.ctx.room_id.clone(), self.ctx.viewer_id, data);
        self.ctx.signaling.send(msg).await?;
        Ok(())
    }

    async fn fail(&mut self, session: Option<&Arc<dyn MediaSession>>, error: NegotiationError) {
        warn!("Peer link {} failed: {}", self, error);
        self.negotiation.close();
        self.publish();
        take_session(&self.session_slot);
        if let Some(session) = session
            && let Err(e) = session.close().await
        {
            warn!("Failed to close media session for {}: {:#}", self, e);
        }
        self.emit(LinkEventKind::Failed(error.to_string()));
    }

    fn publish(&self) {
        let state = self.negotiation.state();
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            self.emit(LinkEventKind::Negotiation(state));
        }
    }

    fn emit(&self, kind: LinkEventKind) {
        let _ = self.ctx.events.send(LinkEvent {
            serial: self.ctx.serial,
            viewer_id: self.ctx.viewer_id,
            kind,
        });
    }
}

async fn apply_candidates(
    session: &Arc<dyn MediaSession>,
    candidates: Vec<IceCandidate>,
) -> Result<(), NegotiationError> {
    for candidate in candidates {
        session.add_ice_candidate(candidate).await?;
    }
    Ok(())
}
