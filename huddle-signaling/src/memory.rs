use crate::channel::SignalingChannel;
use crate::rooms::RoomRegistry;
use async_trait::async_trait;
use dashmap::DashMap;
use huddle_core::{
    IceCandidate, ParticipantId, RoomId, RoomMember, SdpKind, SessionDescription, SignalEvent,
    SignalingError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

const EVENT_BUFFER: usize = 256;

/// In-process signaling backend. Every participant gets a
/// [`MemoryChannel`] off the same hub; the hub relays events between
/// them, optionally delaying delivery to imitate a network round trip.
///
/// Used by tests and local development. The production path is
/// [`crate::WsSignaling`] against the relay server.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<HubInner>,
}

#[derive(Default)]
struct HubInner {
    rooms: RoomRegistry,
    peers: DashMap<ParticipantId, mpsc::UnboundedSender<SignalEvent>>,
    latency: Duration,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub that delays every delivery by `latency`. Per-recipient
    /// ordering is preserved; the delay is applied by the recipient's
    /// queue, not per message.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                latency,
                ..Default::default()
            }),
        }
    }

    pub fn channel(&self) -> MemoryChannel {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        MemoryChannel {
            hub: self.inner.clone(),
            local: Mutex::new(None),
            events,
        }
    }
}

impl HubInner {
    fn deliver(&self, to: ParticipantId, event: SignalEvent) {
        match self.peers.get(&to) {
            Some(tx) => {
                let _ = tx.send(event);
            }
            None => warn!(%to, "dropping signal for disconnected participant"),
        }
    }

    fn fan_out(&self, members: &[RoomMember], event: &SignalEvent) {
        for member in members {
            self.deliver(member.id, event.clone());
        }
    }
}

/// One participant's handle on a [`MemoryHub`].
pub struct MemoryChannel {
    hub: Arc<HubInner>,
    local: Mutex<Option<ParticipantId>>,
    events: broadcast::Sender<SignalEvent>,
}

impl MemoryChannel {
    fn local(&self) -> Result<ParticipantId, SignalingError> {
        self.local
            .lock()
            .expect("local identity lock poisoned")
            .ok_or(SignalingError::NotConnected)
    }
}

#[async_trait]
impl SignalingChannel for MemoryChannel {
    async fn connect(&self, local: ParticipantId) -> Result<(), SignalingError> {
        {
            let mut slot = self.local.lock().expect("local identity lock poisoned");
            if slot.is_some() {
                debug!(%local, "connect on an already connected channel, ignoring");
                return Ok(());
            }
            *slot = Some(local);
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.hub.peers.insert(local, tx.clone());

        // Per-recipient delivery queue: keeps send order even when a
        // simulated latency is configured.
        let latency = self.hub.latency;
        let events = self.events.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                let _ = events.send(event);
            }
        });

        let _ = tx.send(SignalEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(local) = self
            .local
            .lock()
            .expect("local identity lock poisoned")
            .take()
        else {
            return;
        };

        self.hub.peers.remove(&local);
        if let Some((_, remaining)) = self.hub.rooms.leave(local) {
            self.hub.fan_out(
                &remaining,
                &SignalEvent::UserLeft {
                    participant_id: local,
                },
            );
        }

        let _ = self.events.send(SignalEvent::Disconnected);
    }

    async fn create_room(
        &self,
        room_id: RoomId,
        context_id: u64,
        display_name: &str,
    ) -> Result<(), SignalingError> {
        let local = self.local()?;
        let room = self
            .hub
            .rooms
            .create(room_id, context_id, RoomMember::new(local, display_name))?;

        self.hub.deliver(local, SignalEvent::RoomCreated { room_id });

        // Let everyone else on the hub know a call started; idle
        // sessions surface it as an incoming-call prompt.
        for entry in self.hub.peers.iter() {
            if *entry.key() != local {
                self.hub
                    .deliver(*entry.key(), SignalEvent::IncomingCall { room: room.clone() });
            }
        }

        Ok(())
    }

    async fn join_room(&self, room_id: RoomId, display_name: &str) -> Result<(), SignalingError> {
        let local = self.local()?;
        let room = self
            .hub
            .rooms
            .join(room_id, RoomMember::new(local, display_name))?;

        self.hub.fan_out(
            &room.participants,
            &SignalEvent::UserJoined {
                participant_id: local,
                display_name: Some(display_name.to_string()),
                roster: room.participants.clone(),
            },
        );

        Ok(())
    }

    async fn send_description(
        &self,
        to: ParticipantId,
        description: SessionDescription,
    ) -> Result<(), SignalingError> {
        let from = self.local()?;
        let event = match description.kind {
            SdpKind::Offer => SignalEvent::Offer {
                from,
                sdp: description.sdp,
            },
            SdpKind::Answer => SignalEvent::Answer {
                from,
                sdp: description.sdp,
            },
        };

        self.hub.deliver(to, event);
        Ok(())
    }

    async fn send_candidate(
        &self,
        to: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        let from = self.local()?;
        self.hub
            .deliver(to, SignalEvent::IceCandidate { from, candidate });
        Ok(())
    }

    async fn end_call(&self) -> Result<(), SignalingError> {
        let local = self.local()?;
        if let Some((_, members)) = self.hub.rooms.end(local) {
            self.hub.fan_out(&members, &SignalEvent::CallEnded);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.events.subscribe()
    }
}
