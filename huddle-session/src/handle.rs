use crate::media::LocalMedia;
use crate::peer::RemoteStream;
use crate::state::{CallError, CallParticipant, CallState};
use huddle_core::{CallRoom, ParticipantId, RoomId};
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot, watch};

pub(crate) enum SessionCommand {
    CreateCall {
        context_id: u64,
        display_name: String,
        reply: oneshot::Sender<Result<RoomId, CallError>>,
    },
    JoinCall {
        room_id: RoomId,
        display_name: String,
        reply: oneshot::Sender<Result<(), CallError>>,
    },
    EndCall {
        reply: oneshot::Sender<()>,
    },
    ToggleAudio {
        reply: oneshot::Sender<bool>,
    },
    ToggleVideo {
        reply: oneshot::Sender<bool>,
    },
    AcceptCall {
        reply: oneshot::Sender<Option<RoomId>>,
    },
    RejectCall,
}

/// Cloneable UI-facing surface of a running [`crate::Session`].
/// Commands are serialized through the session's event loop, so no
/// two operations ever observe the call mid-mutation.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cmd_tx: mpsc::Sender<SessionCommand>,
    pub(crate) call_state: watch::Receiver<CallState>,
    pub(crate) connected: watch::Receiver<bool>,
    pub(crate) roster: watch::Receiver<Vec<CallParticipant>>,
    pub(crate) local_media: watch::Receiver<Option<LocalMedia>>,
    pub(crate) remote_streams: watch::Receiver<HashMap<ParticipantId, RemoteStream>>,
    pub(crate) incoming_call: watch::Receiver<Option<CallRoom>>,
}

impl SessionHandle {
    async fn ask<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, CallError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| CallError::Closed)?;
        rx.await.map_err(|_| CallError::Closed)
    }

    /// Start a new call for the given context. Returns the room id to
    /// hand out to invitees.
    pub async fn create_video_call(
        &self,
        context_id: u64,
        display_name: impl Into<String>,
    ) -> Result<RoomId, CallError> {
        let display_name = display_name.into();
        self.ask(|reply| SessionCommand::CreateCall {
            context_id,
            display_name,
            reply,
        })
        .await?
    }

    /// Join an existing call by room id.
    pub async fn join_video_call(
        &self,
        room_id: RoomId,
        display_name: impl Into<String>,
    ) -> Result<(), CallError> {
        let display_name = display_name.into();
        self.ask(|reply| SessionCommand::JoinCall {
            room_id,
            display_name,
            reply,
        })
        .await?
    }

    /// Leave the call and release every local resource. Safe to call
    /// at any point, including while negotiation is mid-flight, and
    /// idempotent against a concurrent remote call end.
    pub async fn end_call(&self) -> Result<(), CallError> {
        self.ask(|reply| SessionCommand::EndCall { reply }).await
    }

    /// Flip the local audio track's enabled flag. Returns the new
    /// state; `false` when there is no audio track.
    pub async fn toggle_audio(&self) -> bool {
        self.ask(|reply| SessionCommand::ToggleAudio { reply })
            .await
            .unwrap_or(false)
    }

    /// Flip the local video track's enabled flag. Returns the new
    /// state; `false` when there is no video track.
    pub async fn toggle_video(&self) -> bool {
        self.ask(|reply| SessionCommand::ToggleVideo { reply })
            .await
            .unwrap_or(false)
    }

    /// Dismiss the pending incoming-call prompt, returning its room id
    /// so the caller can follow up with [`Self::join_video_call`].
    /// Dismissing and joining are deliberately separate steps.
    pub async fn accept_call(&self) -> Option<RoomId> {
        self.ask(|reply| SessionCommand::AcceptCall { reply })
            .await
            .unwrap_or(None)
    }

    /// Dismiss the pending incoming-call prompt without joining.
    pub async fn reject_call(&self) {
        let _ = self.cmd_tx.send(SessionCommand::RejectCall).await;
    }

    pub fn call_state(&self) -> CallState {
        *self.call_state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn roster(&self) -> Vec<CallParticipant> {
        self.roster.borrow().clone()
    }

    pub fn local_media(&self) -> Option<LocalMedia> {
        self.local_media.borrow().clone()
    }

    pub fn remote_streams(&self) -> HashMap<ParticipantId, RemoteStream> {
        self.remote_streams.borrow().clone()
    }

    pub fn incoming_call(&self) -> Option<CallRoom> {
        self.incoming_call.borrow().clone()
    }

    pub fn watch_call_state(&self) -> watch::Receiver<CallState> {
        self.call_state.clone()
    }

    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    pub fn watch_local_media(&self) -> watch::Receiver<Option<LocalMedia>> {
        self.local_media.clone()
    }

    pub fn watch_roster(&self) -> watch::Receiver<Vec<CallParticipant>> {
        self.roster.clone()
    }

    pub fn watch_remote_streams(
        &self,
    ) -> watch::Receiver<HashMap<ParticipantId, RemoteStream>> {
        self.remote_streams.clone()
    }

    pub fn watch_incoming_call(&self) -> watch::Receiver<Option<CallRoom>> {
        self.incoming_call.clone()
    }
}
