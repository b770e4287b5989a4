use crate::media::{LocalTrack, TrackKind};
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Negotiation progress of one peer link. `Failed` is terminal: there
/// is no renegotiation path, the entry stays visible as failed until
/// the peer leaves or the call ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    OfferSent,
    OfferReceived,
    AnswerExchanged,
    IceNegotiating,
    Connected,
    Failed,
    Closed,
}

/// Media received from one remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub kinds: Vec<TrackKind>,
}

impl RemoteStream {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kinds: vec![kind],
        }
    }
}

/// Events a peer link reports back to the session, tagged with the
/// remote participant they concern.
#[derive(Debug)]
pub enum PeerEvent {
    TrackReceived(ParticipantId, RemoteStream),
    CandidateGenerated(ParticipantId, IceCandidate),
    StateChanged(ParticipantId, LinkState),
}

/// One negotiated media connection to a remote participant.
///
/// `create_offer` and `create_answer` set the local description as a
/// side effect and return the SDP to relay.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn add_track(&self, track: Arc<LocalTrack>) -> Result<()>;

    async fn create_offer(&self) -> Result<String>;

    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self);
}

/// Factory for peer links. The real-time transport/ICE stack sits
/// behind this seam; [`crate::WebrtcConnector`] is the production
/// backend, tests script their own.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn open(
        &self,
        remote: ParticipantId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Box<dyn PeerLink>>;
}
