use crate::error::TransportError;
use async_trait::async_trait;
use relaycast_core::SignalMessage;

/// Outbound half of the signaling channel.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send(&self, msg: SignalMessage) -> Result<(), TransportError>;
}
