pub use relaycast_core::{PeerId, RoomId};

pub mod model {
    pub use relaycast_core::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use relaycast_server::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use relaycast_peer::*;
}
