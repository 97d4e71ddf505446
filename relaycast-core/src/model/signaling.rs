use crate::model::peer::PeerId;
use crate::model::role::Role;
use crate::model::room::RoomId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// ICE candidate in the shape browsers produce with `RTCIceCandidate.toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
            username_fragment: None,
        }
    }
}

/// Payload of a `signal` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignalData {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate { candidate: IceCandidate },
}

impl SignalData {
    pub fn kind(&self) -> &'static str {
        match self {
            SignalData::Offer { .. } => "offer",
            SignalData::Answer { .. } => "answer",
            SignalData::Candidate { .. } => "candidate",
        }
    }
}

/// Every frame exchanged with the relay.
///
/// `Join`, `Leave` and `Signal` travel client to server, `Signal` also travels
/// server to client. The rest are server notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    Join {
        role: Role,
        room_id: RoomId,
    },
    Leave {
        room_id: RoomId,
    },
    Signal {
        room_id: RoomId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        viewer_id: Option<PeerId>,
        signal_data: SignalData,
    },
    Welcome {
        peer_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    NewViewer {
        viewer_id: PeerId,
    },
    NewBroadcaster {
        room_id: RoomId,
    },
    ViewerLeft {
        viewer_id: PeerId,
    },
    BroadcasterLeft {
        room_id: RoomId,
    },
}

impl SignalMessage {
    pub fn signal(room_id: RoomId, viewer_id: Option<PeerId>, signal_data: SignalData) -> Self {
        SignalMessage::Signal {
            room_id,
            viewer_id,
            signal_data,
        }
    }
}
