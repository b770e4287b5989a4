use crate::error::SignalingError;
use crate::model::participant::{ParticipantId, RoomMember};
use crate::model::room::{CallRoom, RoomId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpKind {
    Offer,
    Answer,
}

/// One half of the offer/answer handshake. The SDP body is opaque to
/// the signaling layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One network path descriptor discovered during negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

/// Commands a participant sends to the signaling channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d")]
pub enum ClientSignal {
    CreateRoom {
        room_id: RoomId,
        context_id: u64,
        display_name: String,
    },
    JoinRoom {
        room_id: RoomId,
        display_name: String,
    },
    Offer {
        to: ParticipantId,
        sdp: String,
    },
    Answer {
        to: ParticipantId,
        sdp: String,
    },
    IceCandidate {
        to: ParticipantId,
        candidate: IceCandidate,
    },
    EndCall,
}

/// Events the signaling channel delivers to a participant. This is the
/// one contract that must match exactly across channel backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ev", content = "d")]
pub enum SignalEvent {
    Connected,
    Disconnected,
    /// Carries the full updated membership so listeners reconcile
    /// rosters from a snapshot instead of incremental deltas.
    UserJoined {
        participant_id: ParticipantId,
        display_name: Option<String>,
        roster: Vec<RoomMember>,
    },
    UserLeft {
        participant_id: ParticipantId,
    },
    Offer {
        from: ParticipantId,
        sdp: String,
    },
    Answer {
        from: ParticipantId,
        sdp: String,
    },
    IceCandidate {
        from: ParticipantId,
        candidate: IceCandidate,
    },
    IncomingCall {
        room: CallRoom,
    },
    CallEnded,
    /// Acknowledges `ClientSignal::CreateRoom` on backends where the
    /// command outcome is not observable in-process.
    RoomCreated {
        room_id: RoomId,
    },
    /// Room-level failure surfaced by the channel instead of a silent
    /// no-op.
    ChannelError {
        error: SignalingError,
    },
}
