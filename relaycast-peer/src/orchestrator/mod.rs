mod broadcaster;
mod viewer;

pub use broadcaster::{Broadcaster, BroadcasterEvent};
pub use viewer::{Viewer, ViewerEvent};
