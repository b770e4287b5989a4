pub mod model;

mod error;

pub use error::{MediaError, SignalingError};
pub use model::{
    CallRoom, ClientSignal, IceCandidate, ParticipantId, RoomId, RoomMember, SdpKind,
    SessionDescription, SignalEvent,
};
