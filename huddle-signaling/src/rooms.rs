use dashmap::DashMap;
use huddle_core::{CallRoom, ParticipantId, RoomId, RoomMember, SignalingError};
use tracing::info;

/// Room membership bookkeeping shared by the channel backends. Rooms
/// live exactly as long as their call: ended by the creator, or
/// destroyed when the last member leaves.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, CallRoom>,
    occupancy: DashMap<ParticipantId, RoomId>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        room_id: RoomId,
        context_id: u64,
        creator: RoomMember,
    ) -> Result<CallRoom, SignalingError> {
        if self.rooms.contains_key(&room_id) {
            return Err(SignalingError::DuplicateRoom(room_id));
        }

        let creator_id = creator.id;
        let room = CallRoom::new(room_id, context_id, creator);
        self.rooms.insert(room_id, room.clone());
        self.occupancy.insert(creator_id, room_id);

        info!(%room_id, created_by = %room.created_by, "room created");
        Ok(room)
    }

    /// Add a member and return the updated snapshot.
    pub fn join(&self, room_id: RoomId, member: RoomMember) -> Result<CallRoom, SignalingError> {
        let Some(mut room) = self.rooms.get_mut(&room_id) else {
            return Err(SignalingError::RoomNotFound(room_id));
        };

        // One entry per participant per room.
        room.participants.retain(|m| m.id != member.id);
        let member_id = member.id;
        room.participants.push(member);
        self.occupancy.insert(member_id, room_id);

        Ok(room.clone())
    }

    /// Remove a participant from the room it occupies. Returns the
    /// remaining members so the caller can notify them; an emptied
    /// room is destroyed.
    pub fn leave(&self, id: ParticipantId) -> Option<(RoomId, Vec<RoomMember>)> {
        let (_, room_id) = self.occupancy.remove(&id)?;
        let mut room = self.rooms.get_mut(&room_id)?;

        room.participants.retain(|m| m.id != id);
        let remaining = room.participants.clone();
        drop(room);

        if remaining.is_empty() {
            self.rooms.remove(&room_id);
            info!(%room_id, "last participant left, room destroyed");
        }

        Some((room_id, remaining))
    }

    /// End the call in the room `id` occupies, releasing it. Returns
    /// the full membership (the ender included) for fan-out.
    pub fn end(&self, id: ParticipantId) -> Option<(RoomId, Vec<RoomMember>)> {
        let room_id = *self.occupancy.get(&id)?;
        let (_, mut room) = self.rooms.remove(&room_id)?;

        room.is_active = false;
        for member in &room.participants {
            self.occupancy.remove(&member.id);
        }

        info!(%room_id, ended_by = %id, "call ended, room released");
        Some((room_id, room.participants))
    }

    pub fn get(&self, room_id: &RoomId) -> Option<CallRoom> {
        self.rooms.get(room_id).map(|r| r.clone())
    }

    pub fn room_of(&self, id: &ParticipantId) -> Option<RoomId> {
        self.occupancy.get(id).map(|r| *r)
    }
}
