//! Client side of a relaycast broadcast.
//!
//! [`Broadcaster`] keeps one negotiated session per viewer, [`Viewer`] keeps a
//! single inbound session and assembles received tracks into one
//! [`MediaSurface`]. Both speak to media through the [`MediaBackend`]
//! capability, so the same orchestration drives a direct peer-to-peer backend
//! or, through [`gateway`], a selective forwarding unit.

mod config;
mod error;
pub mod gateway;
mod link;
mod media;
mod negotiation;
mod orchestrator;
mod signaling;

pub use config::TransportConfig;
pub use error::{MediaAccessError, NegotiationError, PeerError, TransportError};
pub use link::{LinkEvent, LinkEventKind, LinkHandle};
pub use media::*;
pub use negotiation::{CandidateBuffer, Negotiation, NegotiationState};
pub use orchestrator::{Broadcaster, BroadcasterEvent, Viewer, ViewerEvent};
pub use signaling::{SignalClient, SignalSink};
