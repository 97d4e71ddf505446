use crate::config::TransportConfig;
use crate::media::backend::{ConnectionState, MediaBackend, MediaSession, SdpKind, SessionEvent};
use crate::media::track::{LocalMedia, RemoteTrack, TrackKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use relaycast_core::{IceCandidate, IceServerConfig};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp::packet::Packet;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// Media backend on top of the `webrtc` crate.
pub struct WebRtcBackend {
    config: RwLock<TransportConfig>,
}

impl WebRtcBackend {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    fn ice_servers(&self) -> Vec<RTCIceServer> {
        let config = self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        config
            .ice_servers
            .iter()
            .map(|server| RTCIceServer {
                urls: server.urls.clone(),
                username: server.username.clone().unwrap_or_default(),
                credential: server.credential.clone().unwrap_or_default(),
            })
            .collect()
    }
}

impl Default for WebRtcBackend {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

#[async_trait]
impl MediaBackend for WebRtcBackend {
    async fn open_session(
        &self,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Arc<dyn MediaSession>> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: self.ice_servers(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                Box::pin(async move {
                    info!("Peer connection state changed: {:?}", s);
                    if let Some(state) = map_connection_state(s) {
                        let _ = tx.send(SessionEvent::StateChanged(state));
                    }
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(SessionEvent::LocalCandidate(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_mline_index: init.sdp_mline_index,
                    username_fragment: init.username_fragment,
                }));
            })
        }));

        let track_tx = events;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    let Some(kind) = TrackKind::from_codec_type(track.kind()) else {
                        warn!("Ignoring remote track of unknown kind");
                        return;
                    };
                    let id = track.id();
                    debug!("Remote {:?} track {} arrived", kind, id);
                    let (packets, _) = broadcast::channel(RTP_FAN_OUT_CAPACITY);
                    let _ = tx.send(SessionEvent::Track(RemoteTrack {
                        id: id.clone(),
                        stream_id: track.stream_id(),
                        kind,
                        packets: Some(packets.clone()),
                    }));

                    let read = move || {
                        let track = track.clone();
                        async move { track.read_rtp().await.map(|(packet, _)| packet) }
                    };
                    tokio::spawn(pump_track(id, read, packets, tx));
                })
            },
        ));

        Ok(Arc::new(WebRtcSession { peer_connection }))
    }

    fn update_ice_servers(&self, servers: Vec<IceServerConfig>) {
        if servers.is_empty() {
            return;
        }
        let mut config = self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        config.ice_servers = servers;
    }
}

/// Packets a slow subscriber may fall behind before it starts losing them.
const RTP_FAN_OUT_CAPACITY: usize = 256;

/// Reads a remote track until it fails, fanning packets out to subscribers,
/// then reports the track as ended.
async fn pump_track<F, Fut, E>(
    id: String,
    mut read: F,
    packets: broadcast::Sender<Packet>,
    events: mpsc::UnboundedSender<SessionEvent>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Packet, E>>,
    E: fmt::Display,
{
    loop {
        match read().await {
            Ok(packet) => {
                // no subscribers yet is fine
                let _ = packets.send(packet);
            }
            Err(e) => {
                debug!("Remote track {} ended: {}", id, e);
                break;
            }
        }
    }
    let _ = events.send(SessionEvent::TrackEnded(id));
}

fn map_connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::New => Some(ConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}

struct WebRtcSession {
    peer_connection: Arc<RTCPeerConnection>,
}

#[async_trait]
impl MediaSession for WebRtcSession {
    async fn attach_tracks(&self, media: &LocalMedia) -> Result<()> {
        for track in media.tracks() {
            let sender = self
                .peer_connection
                .add_track(track.handle.clone())
                .await
                .with_context(|| format!("Failed to attach track {}", track.id()))?;

            // RTCP has to be read for interceptors (NACK, reports) to work.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while sender.read(&mut rtcp_buf).await.is_ok() {}
            });
        }
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn set_remote_description(&self, kind: SdpKind, sdp: String) -> Result<()> {
        let desc = match kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(sdp)?,
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.peer_connection
            .add_ice_candidate(init)
            .await
            .context("Failed to add remote ICE candidate")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
