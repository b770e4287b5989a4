use crate::handle::{SessionCommand, SessionHandle};
use crate::media::{LocalMedia, MediaConstraints, MediaSource, TrackKind};
use crate::peer::{LinkState, PeerConnector, PeerEvent, PeerLink, RemoteStream};
use crate::state::{CallError, CallParticipant, CallState};
use huddle_core::{
    CallRoom, MediaError, ParticipantId, RoomId, RoomMember, SessionDescription, SignalEvent,
};
use huddle_signaling::SignalingChannel;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 64;
const PEER_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub constraints: MediaConstraints,
}

struct PeerEntry {
    link: Box<dyn PeerLink>,
    state: LinkState,
}

/// The call orchestrator. Owns the peer-link map, local media, remote
/// streams, and the call state machine; everything runs on one event
/// loop, so signaling callbacks and UI commands never interleave
/// mid-operation.
pub struct Session {
    local_id: ParticipantId,
    signaling: Arc<dyn SignalingChannel>,
    media: Arc<dyn MediaSource>,
    connector: Arc<dyn PeerConnector>,
    config: SessionConfig,

    state: CallState,
    tearing_down: bool,
    room: Option<RoomId>,
    members: Vec<RoomMember>,
    local_media: Option<LocalMedia>,
    peers: HashMap<ParticipantId, PeerEntry>,
    remote_streams: HashMap<ParticipantId, RemoteStream>,
    incoming: Option<CallRoom>,

    peer_tx: mpsc::Sender<PeerEvent>,

    call_state_tx: watch::Sender<CallState>,
    connected_tx: watch::Sender<bool>,
    roster_tx: watch::Sender<Vec<CallParticipant>>,
    local_media_tx: watch::Sender<Option<LocalMedia>>,
    remote_streams_tx: watch::Sender<HashMap<ParticipantId, RemoteStream>>,
    incoming_tx: watch::Sender<Option<CallRoom>>,
}

impl Session {
    /// Connect the channel and start the event loop. The returned
    /// handle is the only way to talk to the session.
    pub fn spawn(
        local_id: ParticipantId,
        signaling: Arc<dyn SignalingChannel>,
        media: Arc<dyn MediaSource>,
        connector: Arc<dyn PeerConnector>,
        config: SessionConfig,
    ) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        let (peer_tx, peer_rx) = mpsc::channel(PEER_EVENT_BUFFER);

        let (call_state_tx, call_state) = watch::channel(CallState::Idle);
        let (connected_tx, connected) = watch::channel(false);
        let (roster_tx, roster) = watch::channel(Vec::new());
        let (local_media_tx, local_media) = watch::channel(None);
        let (remote_streams_tx, remote_streams) = watch::channel(HashMap::new());
        let (incoming_tx, incoming_call) = watch::channel(None);

        // Subscribe before connecting so the Connected event is not
        // missed.
        let signal_rx = signaling.subscribe();

        let session = Session {
            local_id,
            signaling,
            media,
            connector,
            config,
            state: CallState::Idle,
            tearing_down: false,
            room: None,
            members: Vec::new(),
            local_media: None,
            peers: HashMap::new(),
            remote_streams: HashMap::new(),
            incoming: None,
            peer_tx,
            call_state_tx,
            connected_tx,
            roster_tx,
            local_media_tx,
            remote_streams_tx,
            incoming_tx,
        };
        tokio::spawn(session.run(cmd_rx, signal_rx, peer_rx));

        SessionHandle {
            cmd_tx,
            call_state,
            connected,
            roster,
            local_media,
            remote_streams,
            incoming_call,
        }
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<SessionCommand>,
        mut signal_rx: broadcast::Receiver<SignalEvent>,
        mut peer_rx: mpsc::Receiver<PeerEvent>,
    ) {
        info!(local = %self.local_id, "session event loop started");

        if let Err(e) = self.signaling.connect(self.local_id).await {
            error!("failed to connect signaling channel: {e}");
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            // Handle dropped: leave the call and go away.
                            self.teardown(true).await;
                            self.signaling.disconnect().await;
                            break;
                        }
                    }
                }

                event = signal_rx.recv() => {
                    match event {
                        Ok(event) => self.handle_signal(event).await,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("signal subscription lagged by {n} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            warn!("signaling channel closed, shutting down session");
                            self.teardown(false).await;
                            break;
                        }
                    }
                }

                Some(event) = peer_rx.recv() => {
                    self.handle_peer_event(event).await;
                }
            }
        }

        info!(local = %self.local_id, "session event loop finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::CreateCall {
                context_id,
                display_name,
                reply,
            } => {
                let result = self.start_call(context_id, &display_name).await;
                let _ = reply.send(result);
            }
            SessionCommand::JoinCall {
                room_id,
                display_name,
                reply,
            } => {
                let result = self.join_call(room_id, &display_name).await;
                let _ = reply.send(result);
            }
            SessionCommand::EndCall { reply } => {
                self.teardown(true).await;
                let _ = reply.send(());
            }
            SessionCommand::ToggleAudio { reply } => {
                let _ = reply.send(self.toggle_track(TrackKind::Audio));
            }
            SessionCommand::ToggleVideo { reply } => {
                let _ = reply.send(self.toggle_track(TrackKind::Video));
            }
            SessionCommand::AcceptCall { reply } => {
                let room_id = self.incoming.take().map(|room| room.id);
                let _ = self.incoming_tx.send(None);
                let _ = reply.send(room_id);
            }
            SessionCommand::RejectCall => {
                self.incoming = None;
                let _ = self.incoming_tx.send(None);
            }
        }
    }

    async fn start_call(
        &mut self,
        context_id: u64,
        display_name: &str,
    ) -> Result<RoomId, CallError> {
        if self.state != CallState::Idle {
            return Err(CallError::InvalidState(self.state));
        }

        let media = self.acquire_media().await?;
        self.set_local_media(Some(media));
        self.set_state(CallState::Calling);

        let room_id = RoomId::new();
        if let Err(e) = self
            .signaling
            .create_room(room_id, context_id, display_name)
            .await
        {
            self.release_media();
            self.set_state(CallState::Idle);
            return Err(e.into());
        }

        self.room = Some(room_id);
        self.members = vec![RoomMember::new(self.local_id, display_name)];
        self.rebuild_roster();

        info!(%room_id, context_id, "video call created");
        Ok(room_id)
    }

    async fn join_call(&mut self, room_id: RoomId, display_name: &str) -> Result<(), CallError> {
        if self.state != CallState::Idle {
            return Err(CallError::InvalidState(self.state));
        }

        let media = self.acquire_media().await?;
        self.set_local_media(Some(media));
        self.set_state(CallState::Connecting);

        if let Err(e) = self.signaling.join_room(room_id, display_name).await {
            self.release_media();
            self.set_state(CallState::Idle);
            return Err(e.into());
        }

        self.room = Some(room_id);
        self.members = vec![RoomMember::new(self.local_id, display_name)];
        self.set_state(CallState::InCall);
        self.rebuild_roster();

        info!(%room_id, "joined video call");
        Ok(())
    }

    /// Ask for camera and microphone; a failed video capture degrades
    /// to audio-only so a missing camera alone never blocks the call.
    /// The second failure is final and classified for the UI.
    async fn acquire_media(&self) -> Result<LocalMedia, MediaError> {
        let want = self.config.constraints.clone();

        match self.media.acquire(want.clone()).await {
            Ok(media) => Ok(media),
            Err(first) if want.video => {
                warn!(error = %first, "video capture failed, retrying audio-only");
                self.media
                    .acquire(MediaConstraints {
                        video: false,
                        ..want
                    })
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn handle_signal(&mut self, event: SignalEvent) {
        match event {
            SignalEvent::Connected => self.set_connected(true),

            SignalEvent::Disconnected => {
                self.set_connected(false);
                if self.state != CallState::Idle {
                    warn!("signaling channel lost mid-call, tearing down");
                    self.teardown(false).await;
                }
            }

            SignalEvent::UserJoined {
                participant_id,
                roster,
                ..
            } => {
                if self.room.is_none() {
                    debug!(%participant_id, "ignoring user-joined outside a call");
                    return;
                }
                self.members = roster;
                if participant_id != self.local_id {
                    // The side already in the room originates the
                    // offer toward the newcomer; the fixed rule keeps
                    // both sides from offering at once.
                    self.open_link_and_offer(participant_id).await;
                }
                self.rebuild_roster();
            }

            SignalEvent::UserLeft { participant_id } => {
                self.members.retain(|m| m.id != participant_id);
                self.drop_peer(participant_id).await;
                self.rebuild_roster();
            }

            SignalEvent::Offer { from, sdp } => self.handle_offer(from, sdp).await,

            SignalEvent::Answer { from, sdp } => self.handle_answer(from, sdp).await,

            SignalEvent::IceCandidate { from, candidate } => {
                match self.peers.get_mut(&from) {
                    Some(entry) => {
                        if let Err(e) = entry
                            .link
                            .add_ice_candidate(candidate)
                            .await
                        {
                            warn!(%from, "failed to add remote candidate: {e:#}");
                        } else if entry.state == LinkState::AnswerExchanged {
                            entry.state = LinkState::IceNegotiating;
                        }
                    }
                    // Candidates can outrun the offer that introduces
                    // the peer; dropping them is recoverable.
                    None => debug!(%from, "dropping candidate for unknown peer"),
                }
            }

            SignalEvent::IncomingCall { room } => {
                if self.state == CallState::Idle {
                    info!(room_id = %room.id, from = %room.created_by, "incoming call");
                    self.incoming = Some(room.clone());
                    let _ = self.incoming_tx.send(Some(room));
                } else {
                    debug!(room_id = %room.id, "already busy, ignoring incoming call");
                }
            }

            SignalEvent::CallEnded => self.teardown(false).await,

            SignalEvent::RoomCreated { room_id } => {
                debug!(%room_id, "room creation acknowledged");
            }

            SignalEvent::ChannelError { error } => {
                warn!(%error, "signaling channel reported an error");
            }
        }
    }

    async fn handle_offer(&mut self, from: ParticipantId, sdp: String) {
        if self.room.is_none() {
            debug!(%from, "ignoring offer outside a call");
            return;
        }

        if !self.peers.contains_key(&from) {
            let Some(link) = self.open_link(from).await else {
                return;
            };
            self.peers.insert(from, PeerEntry {
                link,
                state: LinkState::OfferReceived,
            });
        }

        let answer_sdp = {
            let Some(entry) = self.peers.get_mut(&from) else {
                return;
            };
            if let Err(e) = entry
                .link
                .set_remote_description(SessionDescription::offer(sdp))
                .await
            {
                error!(%from, "failed to apply remote offer: {e:#}");
                entry.state = LinkState::Failed;
                return;
            }

            match entry.link.create_answer().await {
                Ok(sdp) => {
                    entry.state = LinkState::AnswerExchanged;
                    sdp
                }
                Err(e) => {
                    error!(%from, "failed to create answer: {e:#}");
                    entry.state = LinkState::Failed;
                    return;
                }
            }
        };

        if let Err(e) = self
            .signaling
            .send_description(from, SessionDescription::answer(answer_sdp))
            .await
        {
            warn!(%from, "failed to relay answer: {e}");
        }
    }

    async fn handle_answer(&mut self, from: ParticipantId, sdp: String) {
        match self.peers.get_mut(&from) {
            Some(entry) => {
                match entry
                    .link
                    .set_remote_description(SessionDescription::answer(sdp))
                    .await
                {
                    Ok(()) => entry.state = LinkState::AnswerExchanged,
                    Err(e) => {
                        error!(%from, "failed to apply answer: {e:#}");
                        entry.state = LinkState::Failed;
                    }
                }
            }
            // The peer may already have left; a stale answer is not an
            // error.
            None => debug!(%from, "dropping stale answer for unknown peer"),
        }
    }

    async fn open_link_and_offer(&mut self, remote: ParticipantId) {
        if let Some(old) = self.peers.remove(&remote) {
            debug!(%remote, "replacing existing peer link");
            old.link.close().await;
        }

        let Some(link) = self.open_link(remote).await else {
            return;
        };
        let mut entry = PeerEntry {
            link,
            state: LinkState::New,
        };

        match entry.link.create_offer().await {
            Ok(sdp) => {
                entry.state = LinkState::OfferSent;
                self.peers.insert(remote, entry);
                if let Err(e) = self
                    .signaling
                    .send_description(remote, SessionDescription::offer(sdp))
                    .await
                {
                    warn!(%remote, "failed to relay offer: {e}");
                }
            }
            Err(e) => {
                error!(%remote, "failed to create offer: {e:#}");
                entry.state = LinkState::Failed;
                self.peers.insert(remote, entry);
            }
        }
    }

    /// Open a link and wire it: local tracks attached, events routed
    /// back into this loop.
    async fn open_link(&mut self, remote: ParticipantId) -> Option<Box<dyn PeerLink>> {
        let link = match self.connector.open(remote, self.peer_tx.clone()).await {
            Ok(link) => link,
            Err(e) => {
                error!(%remote, "failed to open peer link: {e:#}");
                return None;
            }
        };

        if let Some(media) = &self.local_media {
            for track in &media.tracks {
                if let Err(e) = link.add_track(track.clone()).await {
                    warn!(%remote, kind = %track.kind(), "failed to attach local track: {e:#}");
                }
            }
        }

        Some(link)
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::TrackReceived(from, stream) => {
                if !self.peers.contains_key(&from) {
                    debug!(%from, "dropping track from unknown peer");
                    return;
                }
                match self.remote_streams.get_mut(&from) {
                    Some(existing) => {
                        for kind in stream.kinds {
                            if !existing.kinds.contains(&kind) {
                                existing.kinds.push(kind);
                            }
                        }
                    }
                    None => {
                        self.remote_streams.insert(from, stream);
                    }
                }
                self.publish_remote_streams();
                self.rebuild_roster();
            }

            PeerEvent::CandidateGenerated(to, candidate) => {
                if let Err(e) = self.signaling.send_candidate(to, candidate).await {
                    warn!(%to, "failed to relay candidate: {e}");
                }
            }

            PeerEvent::StateChanged(from, link_state) => match link_state {
                LinkState::Connected => {
                    if let Some(entry) = self.peers.get_mut(&from) {
                        entry.state = LinkState::Connected;
                    }
                    info!(%from, "peer media connection established");
                    if matches!(self.state, CallState::Calling | CallState::Connecting) {
                        self.set_state(CallState::InCall);
                    }
                }
                LinkState::Failed => {
                    if let Some(entry) = self.peers.get_mut(&from) {
                        entry.state = LinkState::Failed;
                    }
                    warn!(%from, "peer negotiation failed; no renegotiation path");
                }
                LinkState::Closed => {
                    self.members.retain(|m| m.id != from);
                    self.drop_peer(from).await;
                    self.rebuild_roster();
                }
                other => {
                    if let Some(entry) = self.peers.get_mut(&from) {
                        entry.state = other;
                    }
                }
            },
        }
    }

    async fn drop_peer(&mut self, id: ParticipantId) {
        if let Some(entry) = self.peers.remove(&id) {
            debug!(%id, "peer link closed");
            entry.link.close().await;
        }
        if self.remote_streams.remove(&id).is_some() {
            self.publish_remote_streams();
        }
    }

    /// Release everything the call holds. Guarded so a local end and a
    /// remote `CallEnded` arriving together tear down exactly once;
    /// the guard clears itself so the next call starts clean.
    async fn teardown(&mut self, notify: bool) {
        if self.state == CallState::Idle || self.tearing_down {
            return;
        }
        self.tearing_down = true;
        info!(notify, "tearing down call");

        if notify {
            if let Err(e) = self.signaling.end_call().await {
                warn!("failed to notify call end: {e}");
            }
        }

        self.release_media();

        for (_, entry) in self.peers.drain() {
            entry.link.close().await;
        }

        self.remote_streams.clear();
        self.publish_remote_streams();
        self.members.clear();
        self.room = None;
        self.incoming = None;
        let _ = self.incoming_tx.send(None);
        self.rebuild_roster();
        self.set_state(CallState::Idle);
        self.tearing_down = false;
    }

    fn toggle_track(&self, kind: TrackKind) -> bool {
        match self.local_media.as_ref().and_then(|m| m.track(kind)) {
            Some(track) => track.toggle(),
            None => false,
        }
    }

    /// The roster is always rebuilt from the latest authoritative
    /// snapshot, never patched incrementally.
    fn rebuild_roster(&mut self) {
        let roster = if self.room.is_none() {
            Vec::new()
        } else {
            let mut roster = vec![CallParticipant {
                id: self.local_id,
                name: "You".to_string(),
                is_host: true,
                stream: None,
            }];

            for member in &self.members {
                if member.id == self.local_id {
                    continue;
                }
                let name = member
                    .display_name
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("User {}", member.id.short()));
                roster.push(CallParticipant {
                    id: member.id,
                    name,
                    is_host: false,
                    stream: self.remote_streams.get(&member.id).cloned(),
                });
            }
            roster
        };

        let _ = self.roster_tx.send(roster);
    }

    fn set_state(&mut self, state: CallState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "call state changed");
        }
        self.state = state;
        let _ = self.call_state_tx.send(state);
    }

    fn set_connected(&mut self, connected: bool) {
        let _ = self.connected_tx.send(connected);
    }

    fn set_local_media(&mut self, media: Option<LocalMedia>) {
        self.local_media = media.clone();
        let _ = self.local_media_tx.send(media);
    }

    fn release_media(&mut self) {
        if let Some(media) = self.local_media.take() {
            for track in &media.tracks {
                track.stop();
            }
        }
        let _ = self.local_media_tx.send(None);
    }

    fn publish_remote_streams(&mut self) {
        let _ = self.remote_streams_tx.send(self.remote_streams.clone());
    }
}
