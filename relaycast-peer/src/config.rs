use relaycast_core::IceServerConfig;

/// WebRTC settings (STUN/TURN).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun("stun:stun.l.google.com:19302")],
        }
    }
}
