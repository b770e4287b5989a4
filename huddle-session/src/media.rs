use async_trait::async_trait;
use huddle_core::MediaError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Capture hints passed to the media source. Backends treat them as
/// hints, not hard requirements.
#[derive(Debug, Clone)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
    pub width: u32,
    pub height: u32,
    pub echo_cancellation: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            width: 1280,
            height: 720,
            echo_cancellation: true,
        }
    }
}

/// One locally captured track. The enabled flag is the mute switch the
/// UI toggles; stopping is terminal and happens once, on teardown.
pub struct LocalTrack {
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
    rtc: Option<Arc<TrackLocalStaticSample>>,
    on_stop: Option<Box<dyn Fn() + Send + Sync>>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            rtc: None,
            on_stop: None,
        }
    }

    /// Attach the webrtc-level track this local track feeds.
    pub fn with_rtc(mut self, rtc: Arc<TrackLocalStaticSample>) -> Self {
        self.rtc = Some(rtc);
        self
    }

    /// Install a hook run on every `stop()` call. Backends use it to
    /// release capture resources.
    pub fn with_stop_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_stop = Some(Box::new(hook));
        self
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Flip the enabled flag and return the new state.
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(hook) = &self.on_stop {
            hook();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub(crate) fn rtc(&self) -> Option<&Arc<TrackLocalStaticSample>> {
        self.rtc.as_ref()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The local capture bundle handed to peer links and the UI.
#[derive(Debug, Clone, Default)]
pub struct LocalMedia {
    pub tracks: Vec<Arc<LocalTrack>>,
}

impl LocalMedia {
    pub fn track(&self, kind: TrackKind) -> Option<&Arc<LocalTrack>> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.track(kind).is_some()
    }
}

/// Camera/microphone access. Device capture proper lives outside this
/// crate; implementations wire real capture (or synthesized frames)
/// into [`LocalTrack`]s.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia, MediaError>;
}

/// Media source producing silent/blank webrtc sample tracks. No device
/// I/O, so acquisition never fails; useful for headless peers and
/// demos.
#[derive(Debug, Default)]
pub struct SyntheticMedia;

impl SyntheticMedia {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaSource for SyntheticMedia {
    async fn acquire(&self, constraints: MediaConstraints) -> Result<LocalMedia, MediaError> {
        let mut tracks = Vec::new();

        if constraints.audio {
            let rtc = Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_owned(),
                    ..Default::default()
                },
                "audio".to_owned(),
                "huddle-local".to_owned(),
            ));
            tracks.push(Arc::new(LocalTrack::new(TrackKind::Audio).with_rtc(rtc)));
        }

        if constraints.video {
            let rtc = Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_owned(),
                    ..Default::default()
                },
                "video".to_owned(),
                "huddle-local".to_owned(),
            ));
            tracks.push(Arc::new(LocalTrack::new(TrackKind::Video).with_rtc(rtc)));
        }

        debug!(
            audio = constraints.audio,
            video = constraints.video,
            "synthetic media acquired"
        );
        Ok(LocalMedia { tracks })
    }
}
