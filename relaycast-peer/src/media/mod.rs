mod backend;
mod capture;
mod surface;
mod track;
mod webrtc_backend;

pub use backend::{ConnectionState, MediaBackend, MediaSession, SdpKind, SessionEvent};
pub use capture::{MediaCapture, StaticSampleCapture};
pub use surface::MediaSurface;
pub use track::{LocalMedia, LocalTrack, RemoteTrack, TrackKind};
pub use webrtc_backend::WebRtcBackend;
