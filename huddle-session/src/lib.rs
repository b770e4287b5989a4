//! Call orchestration: turns signaling events into negotiated peer
//! media connections and exposes a UI-consumable view of the call.
//!
//! The [`Session`] actor owns all mutable call state (peer links,
//! local media, remote streams, roster); the cloneable
//! [`SessionHandle`] is the UI-facing surface.

mod handle;
mod media;
mod peer;
mod session;
mod state;
mod webrtc_link;

pub use handle::SessionHandle;
pub use media::{LocalMedia, LocalTrack, MediaConstraints, MediaSource, SyntheticMedia, TrackKind};
pub use peer::{LinkState, PeerConnector, PeerEvent, PeerLink, RemoteStream};
pub use session::{Session, SessionConfig};
pub use state::{CallError, CallParticipant, CallState};
pub use webrtc_link::{WebrtcConfig, WebrtcConnector};
