use crate::rooms::RoomRegistry;
use axum::extract::ws::Message;
use dashmap::DashMap;
use huddle_core::{
    ClientSignal, IceCandidate, ParticipantId, RoomMember, SignalEvent, SignalingError,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

struct RelayInner {
    peers: DashMap<ParticipantId, mpsc::UnboundedSender<Message>>,
    rooms: RoomRegistry,
}

/// Shared state of the relay: connected sockets plus room membership.
/// The ws handler feeds parsed [`ClientSignal`]s in; the service fans
/// [`SignalEvent`]s back out over the participants' sockets.
#[derive(Clone)]
pub struct RelayService {
    inner: Arc<RelayInner>,
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                peers: DashMap::new(),
                rooms: RoomRegistry::new(),
            }),
        }
    }

    pub fn add_peer(&self, id: ParticipantId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(id, tx);
        self.send_event(id, &SignalEvent::Connected);
    }

    pub fn remove_peer(&self, id: ParticipantId) {
        self.inner.peers.remove(&id);
        if let Some((_, remaining)) = self.inner.rooms.leave(id) {
            for member in remaining {
                self.send_event(member.id, &SignalEvent::UserLeft { participant_id: id });
            }
        }
    }

    pub fn handle_signal(&self, from: ParticipantId, signal: ClientSignal) {
        match signal {
            ClientSignal::CreateRoom {
                room_id,
                context_id,
                display_name,
            } => {
                match self
                    .inner
                    .rooms
                    .create(room_id, context_id, RoomMember::new(from, &display_name))
                {
                    Ok(room) => {
                        self.send_event(from, &SignalEvent::RoomCreated { room_id });
                        for entry in self.inner.peers.iter() {
                            if *entry.key() != from {
                                self.send_event(
                                    *entry.key(),
                                    &SignalEvent::IncomingCall { room: room.clone() },
                                );
                            }
                        }
                    }
                    Err(error) => self.send_error(from, error),
                }
            }

            ClientSignal::JoinRoom {
                room_id,
                display_name,
            } => match self
                .inner
                .rooms
                .join(room_id, RoomMember::new(from, &display_name))
            {
                Ok(room) => {
                    let event = SignalEvent::UserJoined {
                        participant_id: from,
                        display_name: Some(display_name),
                        roster: room.participants.clone(),
                    };
                    for member in &room.participants {
                        self.send_event(member.id, &event);
                    }
                }
                Err(error) => self.send_error(from, error),
            },

            ClientSignal::Offer { to, sdp } => {
                self.send_event(to, &SignalEvent::Offer { from, sdp });
            }

            ClientSignal::Answer { to, sdp } => {
                self.send_event(to, &SignalEvent::Answer { from, sdp });
            }

            ClientSignal::IceCandidate { to, candidate } => {
                self.relay_candidate(from, to, candidate);
            }

            ClientSignal::EndCall => {
                if let Some((_, members)) = self.inner.rooms.end(from) {
                    info!(ended_by = %from, "relaying call end to {} members", members.len());
                    for member in members {
                        self.send_event(member.id, &SignalEvent::CallEnded);
                    }
                }
            }
        }
    }

    fn relay_candidate(&self, from: ParticipantId, to: ParticipantId, candidate: IceCandidate) {
        self.send_event(to, &SignalEvent::IceCandidate { from, candidate });
    }

    fn send_error(&self, to: ParticipantId, error: SignalingError) {
        warn!(%to, %error, "signaling command failed");
        self.send_event(to, &SignalEvent::ChannelError { error });
    }

    fn send_event(&self, to: ParticipantId, event: &SignalEvent) {
        let Some(peer) = self.inner.peers.get(&to) else {
            warn!(%to, "dropping event for disconnected participant");
            return;
        };

        match serde_json::to_string(event) {
            Ok(json) => {
                if let Err(e) = peer.send(Message::Text(json.into())) {
                    error!(%to, "failed to queue ws message: {e}");
                }
            }
            Err(e) => error!("failed to serialize signal event: {e}"),
        }
    }
}
