use relaycast_core::IceServerConfig;
use std::net::{Ipv4Addr, SocketAddr};

/// Runtime settings of the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    /// Handed to every client right after it connects.
    pub ice_servers: Vec<IceServerConfig>,
    pub room_channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
            room_channel_capacity: 100,
        }
    }
}
