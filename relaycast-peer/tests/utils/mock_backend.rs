use anyhow::{Result, bail};
use async_trait::async_trait;
use relaycast_core::IceCandidate;
use relaycast_peer::{
    ConnectionState, LocalMedia, MediaAccessError, MediaBackend, MediaCapture, MediaSession,
    SdpKind, SessionEvent,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    AttachTracks(usize),
    CreateOffer,
    CreateAnswer,
    SetRemote(SdpKind, String),
    AddCandidate(String),
    Close,
}

/// Session double. Offers and answers are `offer-<n>` / `answer-<n>` where
/// `n` is the order in which the backend opened the session.
pub struct MockSession {
    pub index: usize,
    calls: Mutex<Vec<SessionCall>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    reject_sdp: Option<String>,
    auto_connect: bool,
    closed: AtomicBool,
}

impl MockSession {
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Candidates applied to this session, in application order.
    pub fn applied_candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SessionCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MediaSession for MockSession {
    async fn attach_tracks(&self, media: &LocalMedia) -> Result<()> {
        self.record(SessionCall::AttachTracks(media.tracks().len()));
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        self.record(SessionCall::CreateOffer);
        Ok(format!("offer-{}", self.index))
    }

    async fn create_answer(&self) -> Result<String> {
        self.record(SessionCall::CreateAnswer);
        if self.auto_connect {
            self.emit(SessionEvent::StateChanged(ConnectionState::Connected));
        }
        Ok(format!("answer-{}", self.index))
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        if self.reject_sdp.as_deref() == Some(sdp.as_str()) {
            bail!("remote description rejected: {sdp}");
        }
        self.record(SessionCall::SetRemote(kind, sdp));
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.record(SessionCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record(SessionCall::Close);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Backend double that records every session it opens.
#[derive(Clone, Default)]
pub struct MockBackend {
    sessions: Arc<Mutex<Vec<Arc<MockSession>>>>,
    reject_sdp: Option<String>,
    auto_connect: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions fail `set_remote_description` for exactly this sdp.
    pub fn rejecting(sdp: &str) -> Self {
        Self {
            reject_sdp: Some(sdp.to_owned()),
            ..Self::default()
        }
    }

    /// Sessions report a connected transport as soon as they answer.
    pub fn auto_connecting() -> Self {
        Self {
            auto_connect: true,
            ..Self::default()
        }
    }

    pub fn session(&self, index: usize) -> Arc<MockSession> {
        self.sessions.lock().unwrap()[index].clone()
    }

    /// Session that produced the given offer or answer.
    pub fn session_for(&self, sdp: &str) -> Arc<MockSession> {
        let index = sdp
            .rsplit('-')
            .next()
            .and_then(|n| n.parse::<usize>().ok())
            .expect("sdp produced by MockSession");
        self.session(index)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    async fn open_session(
        &self,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<dyn MediaSession>> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = Arc::new(MockSession {
            index: sessions.len(),
            calls: Mutex::new(Vec::new()),
            events,
            reject_sdp: self.reject_sdp.clone(),
            auto_connect: self.auto_connect,
            closed: AtomicBool::new(false),
        });
        sessions.push(session.clone());
        Ok(session)
    }
}

/// Capture double counting how often it was asked for media.
#[derive(Clone, Default)]
pub struct MockCapture {
    acquired: Arc<AtomicUsize>,
    denied: bool,
}

impl MockCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::default()
        }
    }

    pub fn acquire_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaCapture for MockCapture {
    async fn acquire(&self) -> Result<LocalMedia, MediaAccessError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        if self.denied {
            return Err(MediaAccessError::PermissionDenied);
        }
        Ok(LocalMedia::default())
    }
}
