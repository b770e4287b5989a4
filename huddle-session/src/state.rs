use crate::peer::RemoteStream;
use huddle_core::{MediaError, ParticipantId, SignalingError};
use thiserror::Error;

/// Lifecycle of the local participant's call. Transitions gate which
/// operations are valid; `end_call` is only meaningful outside `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    /// Outgoing call created, waiting for peers.
    Calling,
    /// Joining an existing call.
    Connecting,
    /// At least one negotiated connection.
    InCall,
}

/// UI-facing roster entry. The local participant is always first,
/// shown as "You" and flagged host regardless of who actually created
/// the room; that is a display convention, not an authorization claim.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParticipant {
    pub id: ParticipantId,
    pub name: String,
    pub is_host: bool,
    pub stream: Option<RemoteStream>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Signaling(#[from] SignalingError),
    #[error("operation not valid while {0:?}")]
    InvalidState(CallState),
    #[error("the session has shut down")]
    Closed,
}
