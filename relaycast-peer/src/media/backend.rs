use crate::media::track::{LocalMedia, RemoteTrack};
use anyhow::Result;
use async_trait::async_trait;
use relaycast_core::{IceCandidate, IceServerConfig};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport-level connectivity as reported by the media stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// What a session reports back while it runs.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LocalCandidate(IceCandidate),
    Track(RemoteTrack),
    /// The remote side stopped sending the track with this id.
    TrackEnded(String),
    StateChanged(ConnectionState),
}

/// One negotiated media connection.
///
/// `create_offer` and `create_answer` also apply the result as the local
/// description.
#[async_trait]
pub trait MediaSession: Send + Sync {
    async fn attach_tracks(&self, media: &LocalMedia) -> Result<()>;
    async fn create_offer(&self) -> Result<String>;
    async fn create_answer(&self) -> Result<String>;
    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Opens media sessions. Implemented by the direct WebRTC stack, and by test
/// doubles.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn open_session(
        &self,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<dyn MediaSession>>;

    /// ICE servers announced by the relay after connecting.
    fn update_ice_servers(&self, _servers: Vec<IceServerConfig>) {}
}
