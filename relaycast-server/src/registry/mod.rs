mod directory;
mod room_registry;

pub use directory::*;
pub use room_registry::*;
