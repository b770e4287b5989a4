//! Signaling substrate for call setup: room lifecycle plus pairwise
//! relay of session descriptions and ICE candidates. Owns no media or
//! peer-connection state.

mod channel;
mod memory;
mod rooms;
mod ws;

pub mod server;

pub use channel::SignalingChannel;
pub use memory::{MemoryChannel, MemoryHub};
pub use rooms::RoomRegistry;
pub use ws::WsSignaling;
