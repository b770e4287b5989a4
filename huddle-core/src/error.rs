use crate::model::RoomId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Local capture failures. The variants matter to the UI because the
/// remediation differs: a denied permission is fixed in browser or OS
/// settings, a missing device is fixed by plugging one in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("camera/microphone access was denied")]
    PermissionDenied,
    #[error("no camera or microphone was found")]
    DeviceNotFound,
    #[error("the capture device is already in use by another application")]
    DeviceBusy,
    #[error("the requested capture settings are not supported by this device")]
    UnsupportedConstraints,
    #[error("media capture failed: {0}")]
    AcquisitionFailed(String),
}

/// Room-level and transport-level signaling failures.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SignalingError {
    #[error("room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("room {0} already exists")]
    DuplicateRoom(RoomId),
    #[error("not connected to the signaling channel")]
    NotConnected,
    #[error("signaling transport failed: {0}")]
    Transport(String),
}
