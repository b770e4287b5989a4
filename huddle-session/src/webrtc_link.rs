use crate::media::{LocalTrack, TrackKind};
use crate::peer::{LinkState, PeerConnector, PeerEvent, PeerLink, RemoteStream};
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId, SdpKind, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

#[derive(Debug, Clone)]
pub struct WebrtcConfig {
    pub ice_servers: Vec<String>,
}

impl Default for WebrtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![
                "stun:stun.l.google.com:19302".to_owned(),
                "stun:stun1.l.google.com:19302".to_owned(),
            ],
        }
    }
}

/// Production [`PeerConnector`] over the webrtc crate.
pub struct WebrtcConnector {
    config: WebrtcConfig,
}

impl WebrtcConnector {
    pub fn new(config: WebrtcConfig) -> Self {
        Self { config }
    }
}

impl Default for WebrtcConnector {
    fn default() -> Self {
        Self::new(WebrtcConfig::default())
    }
}

#[async_trait]
impl PeerConnector for WebrtcConnector {
    async fn open(
        &self,
        remote: ParticipantId,
        events: mpsc::Sender<PeerEvent>,
    ) -> Result<Box<dyn PeerLink>> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        // Connection health feeds the session's per-peer state.
        let state_tx = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();

            Box::pin(async move {
                info!(%remote, state = ?s, "peer connection state changed");
                let mapped = match s {
                    RTCPeerConnectionState::Connected => Some(LinkState::Connected),
                    RTCPeerConnectionState::Failed => Some(LinkState::Failed),
                    RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                        Some(LinkState::Closed)
                    }
                    _ => None,
                };
                if let Some(state) = mapped {
                    let _ = tx.send(PeerEvent::StateChanged(remote, state)).await;
                }
            })
        }));

        // Trickle ICE: every locally discovered candidate goes back to
        // the session for relay.
        let ice_tx = events.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                };
                let _ = tx.send(PeerEvent::CandidateGenerated(remote, candidate)).await;
            })
        }));

        let track_tx = events.clone();
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Video => TrackKind::Video,
                        _ => TrackKind::Audio,
                    };
                    debug!(%remote, %kind, "inbound remote track");
                    let stream = RemoteStream::new(track.stream_id(), kind);
                    let _ = tx.send(PeerEvent::TrackReceived(remote, stream)).await;
                })
            },
        ));

        Ok(Box::new(WebrtcLink { remote, pc }))
    }
}

pub(crate) struct WebrtcLink {
    remote: ParticipantId,
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerLink for WebrtcLink {
    async fn add_track(&self, track: Arc<LocalTrack>) -> Result<()> {
        // Test fakes carry no webrtc-level track; nothing to send then.
        let Some(rtc) = track.rtc() else {
            return Ok(());
        };

        self.pc
            .add_track(rtc.clone() as Arc<dyn TrackLocal + Send + Sync>)
            .await?;
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self.pc.create_offer(None).await?;
        let sdp = offer.sdp.clone();
        self.pc.set_local_description(offer).await?;
        debug!(remote = %self.remote, "offer created and set as local description");
        Ok(sdp)
    }

    async fn create_answer(&self) -> Result<String> {
        let answer = self.pc.create_answer(None).await?;
        let sdp = answer.sdp.clone();
        self.pc.set_local_description(answer).await?;
        debug!(remote = %self.remote, "answer created and set as local description");
        Ok(sdp)
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        let sd = match description.kind {
            SdpKind::Offer => RTCSessionDescription::offer(description.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(description.sdp)?,
        };
        self.pc.set_remote_description(sd).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    async fn close(&self) {
        let _ = self.pc.close().await;
    }
}
