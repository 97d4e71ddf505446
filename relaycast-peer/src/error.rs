use crate::gateway::GatewayError;
use crate::negotiation::NegotiationState;

/// The signaling connection is gone. Never retried: the caller has to rejoin.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("signaling connection closed, rejoin to continue")]
    Closed,

    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
}

/// A negotiation step failed or was not allowed in the current state.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("{event} is not valid in state {from:?}")]
    InvalidTransition {
        from: NegotiationState,
        event: &'static str,
    },

    #[error("peer link is closed")]
    Closed,

    #[error(transparent)]
    Signaling(#[from] TransportError),

    #[error(transparent)]
    Session(#[from] anyhow::Error),
}

/// Local capture could not be started. Fatal to a broadcast.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MediaAccessError {
    #[error("capture permission denied")]
    PermissionDenied,

    #[error("capture device unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    MediaAccess(#[from] MediaAccessError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
