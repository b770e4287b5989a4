use crate::model::participant::{ParticipantId, RoomMember};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One call: membership plus lifecycle bookkeeping. Owned by the
/// signaling layer for the duration of the call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRoom {
    pub id: RoomId,
    /// Task or other context the call was started from.
    pub context_id: u64,
    pub created_by: String,
    pub participants: Vec<RoomMember>,
    pub is_active: bool,
    pub created_at: SystemTime,
}

impl CallRoom {
    pub fn new(id: RoomId, context_id: u64, creator: RoomMember) -> Self {
        let created_by = creator.display_name.clone().unwrap_or_default();
        Self {
            id,
            context_id,
            created_by,
            participants: vec![creator],
            is_active: true,
            created_at: SystemTime::now(),
        }
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.iter().any(|m| &m.id == id)
    }
}
