use async_trait::async_trait;
use relaycast_core::{IceCandidate, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// A publisher stream inside a gateway room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedId(pub u64);

/// A plugin handle attached within a gateway session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attachment {
    pub session: SessionId,
    pub handle: HandleId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayRole {
    Publisher,
    Subscriber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room: RoomId,
    pub role: GatewayRole,
    pub display: String,
    /// Feed to receive. Subscribers only.
    pub feed: Option<FeedId>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("room already exists")]
    AlreadyExists,

    #[error("already joined")]
    AlreadyJoined,

    #[error("room has no publisher")]
    NoPublisher,

    #[error("gateway sent no offer for the subscription")]
    MissingOffer,

    #[error("gateway rejected the request ({code}): {reason}")]
    Rejected { code: u16, reason: String },

    #[error("gateway unreachable: {0}")]
    Unreachable(String),
}

impl GatewayError {
    pub const ALREADY_JOINED: u16 = 425;
    pub const ROOM_EXISTS: u16 = 427;

    /// Maps a gateway error code onto the conditions callers act on.
    pub fn from_code(code: u16, reason: impl Into<String>) -> Self {
        match code {
            Self::ALREADY_JOINED => GatewayError::AlreadyJoined,
            Self::ROOM_EXISTS => GatewayError::AlreadyExists,
            code => GatewayError::Rejected {
                code,
                reason: reason.into(),
            },
        }
    }
}

/// The operations the orchestrators need from a media-routing gateway.
#[async_trait]
pub trait MediaGateway: Send + Sync {
    async fn create_session(&self) -> Result<SessionId, GatewayError>;

    async fn attach(&self, session: SessionId) -> Result<HandleId, GatewayError>;

    async fn create_room(&self, at: Attachment, room: &RoomId) -> Result<(), GatewayError>;

    async fn list_publishers(
        &self,
        at: Attachment,
        room: &RoomId,
    ) -> Result<Vec<FeedId>, GatewayError>;

    /// Joins a room. Subscribers get the gateway's offer back.
    async fn join(&self, at: Attachment, request: JoinRequest)
    -> Result<Option<String>, GatewayError>;

    /// Sends the publisher's offer, returns the gateway's answer.
    async fn publish(&self, at: Attachment, offer: String) -> Result<String, GatewayError>;

    /// Sends the subscriber's answer and starts the flow of media.
    async fn start(&self, at: Attachment, answer: String) -> Result<(), GatewayError>;

    async fn trickle(&self, at: Attachment, candidate: IceCandidate) -> Result<(), GatewayError>;
}
