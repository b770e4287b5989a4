mod participant;
mod room;
mod signal;

pub use participant::{ParticipantId, RoomMember};
pub use room::{CallRoom, RoomId};
pub use signal::{ClientSignal, IceCandidate, SdpKind, SessionDescription, SignalEvent};
