use crate::error::MediaAccessError;
use crate::media::track::{LocalMedia, LocalTrack, TrackKind};
use async_trait::async_trait;
use std::sync::Arc;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Source of the broadcaster's camera and microphone.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire(&self) -> Result<LocalMedia, MediaAccessError>;
}

/// Capture backed by sample tracks that an encoder outside this crate feeds
/// through [`video`](Self::video) and [`audio`](Self::audio).
pub struct StaticSampleCapture {
    video: Arc<TrackLocalStaticSample>,
    audio: Arc<TrackLocalStaticSample>,
}

impl StaticSampleCapture {
    pub fn new(stream_id: &str) -> Self {
        let video = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            stream_id.to_owned(),
        );
        let audio = TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            stream_id.to_owned(),
        );
        Self {
            video: Arc::new(video),
            audio: Arc::new(audio),
        }
    }

    pub fn video(&self) -> Arc<TrackLocalStaticSample> {
        self.video.clone()
    }

    pub fn audio(&self) -> Arc<TrackLocalStaticSample> {
        self.audio.clone()
    }
}

#[async_trait]
impl MediaCapture for StaticSampleCapture {
    async fn acquire(&self) -> Result<LocalMedia, MediaAccessError> {
        Ok(LocalMedia::new(vec![
            LocalTrack {
                kind: TrackKind::Video,
                handle: self.video.clone(),
            },
            LocalTrack {
                kind: TrackKind::Audio,
                handle: self.audio.clone(),
            },
        ]))
    }
}
