//! Gateway-mediated variant: the broadcaster publishes to, and viewers
//! subscribe from, a selective forwarding unit instead of each other.
//!
//! The negotiation discipline is the same as the direct variant. Only the
//! transport of descriptions and candidates changes.

mod link;
mod media_gateway;
mod publisher;
mod subscriber;

pub use media_gateway::{
    Attachment, FeedId, GatewayError, GatewayRole, HandleId, JoinRequest, MediaGateway, SessionId,
};
pub use publisher::GatewayPublisher;
pub use subscriber::GatewaySubscriber;
