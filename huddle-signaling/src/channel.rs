use async_trait::async_trait;
use huddle_core::{
    IceCandidate, ParticipantId, RoomId, SessionDescription, SignalEvent, SignalingError,
};
use tokio::sync::broadcast;

/// Bidirectional event channel between call participants.
///
/// Backends differ only in transport: [`crate::MemoryHub`] relays
/// in-process (tests, local development), [`crate::WsSignaling`] talks
/// to the relay server. The event contract is identical for both.
///
/// Delivery guarantees: messages between one sender/recipient pair
/// arrive exactly once, in send order. Nothing is guaranteed across
/// pairs, and candidates may arrive before the offer that introduced
/// the peer; consumers drop those instead of failing.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Establish the participant's identity on the channel. Calling
    /// while already connected is a no-op. Emits [`SignalEvent::Connected`]
    /// once the channel is usable; subscribe before connecting.
    async fn connect(&self, local: ParticipantId) -> Result<(), SignalingError>;

    /// Tear down the channel association. Rooms the participant
    /// occupies are left, and remaining members are notified.
    async fn disconnect(&self);

    /// Register a new room owned by the local participant. Duplicate
    /// room ids are rejected.
    async fn create_room(
        &self,
        room_id: RoomId,
        context_id: u64,
        display_name: &str,
    ) -> Result<(), SignalingError>;

    /// Join an existing room. All members, the joiner included,
    /// receive [`SignalEvent::UserJoined`] with the updated roster.
    async fn join_room(&self, room_id: RoomId, display_name: &str) -> Result<(), SignalingError>;

    /// Relay an offer or answer to one participant.
    async fn send_description(
        &self,
        to: ParticipantId,
        description: SessionDescription,
    ) -> Result<(), SignalingError>;

    /// Relay a connectivity candidate to one participant.
    async fn send_candidate(
        &self,
        to: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError>;

    /// End the call in the room the local participant occupies. Every
    /// member receives [`SignalEvent::CallEnded`] and the room is
    /// released. A no-op when not in a room.
    async fn end_call(&self) -> Result<(), SignalingError>;

    /// Subscribe to channel events. Fan-out: every subscriber sees
    /// every event.
    fn subscribe(&self) -> broadcast::Receiver<SignalEvent>;
}
