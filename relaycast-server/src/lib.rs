//! Signaling relay for one-to-many live broadcasts.
//!
//! Connections join a room as broadcaster or viewer. The relay keeps the
//! authoritative room registry, introduces viewers to the broadcaster and
//! routes offer/answer/candidate messages strictly between the matched pair.

mod config;
mod error;
mod registry;
mod relay;
mod room;
mod router;
mod signaling;
mod stats;

pub use config::RelayConfig;
pub use error::RelayError;
pub use registry::{Registration, RoomDirectory, RoomRecord, RoomRegistry};
pub use relay::Relay;
pub use room::{Room, RoomCommand, RoomManager};
pub use router::{router, serve};
pub use signaling::{SignalingOutput, SignalingService, ws_handler};
pub use stats::{RelayStats, RelayStatsSnapshot};
