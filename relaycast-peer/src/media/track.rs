use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::TrackLocal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub fn from_codec_type(codec_type: RTPCodecType) -> Option<Self> {
        match codec_type {
            RTPCodecType::Audio => Some(TrackKind::Audio),
            RTPCodecType::Video => Some(TrackKind::Video),
            _ => None,
        }
    }
}

/// A captured track ready to be attached to any number of sessions.
#[derive(Clone)]
pub struct LocalTrack {
    pub kind: TrackKind,
    pub handle: Arc<dyn TrackLocal + Send + Sync>,
}

impl LocalTrack {
    pub fn id(&self) -> &str {
        self.handle.id()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id())
            .field("kind", &self.kind)
            .finish()
    }
}

/// The broadcaster's capture. Acquired once and shared by every viewer link.
#[derive(Debug, Clone, Default)]
pub struct LocalMedia {
    tracks: Vec<LocalTrack>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<LocalTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[LocalTrack] {
        &self.tracks
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A track received from the remote side.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub stream_id: String,
    pub kind: TrackKind,
    /// Fan-out of the track's RTP packets. Absent for tracks produced by
    /// test backends.
    pub packets: Option<broadcast::Sender<Packet>>,
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            stream_id: String::new(),
            kind,
            packets: None,
        }
    }

    /// Receives the packets that arrive from now on.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<Packet>> {
        self.packets.as_ref().map(|packets| packets.subscribe())
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id)
            .field("kind", &self.kind)
            .finish()
    }
}
