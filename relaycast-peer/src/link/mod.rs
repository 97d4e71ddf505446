mod peer_link;

pub use peer_link::{LinkEvent, LinkEventKind, LinkHandle};
pub(crate) use peer_link::{LinkCommand, LinkContext, LinkStart};
