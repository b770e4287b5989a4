use huddle_core::MediaError;
use huddle_session::{CallError, CallState};

use crate::integration::{init_tracing, scripted_session_with, settle};
use crate::utils::FakeMedia;

#[tokio::test]
async fn test_denied_capture_fails_with_permission_error() {
    init_tracing();

    let s = scripted_session_with(FakeMedia::denied());
    let err = s
        .handle
        .create_video_call(1, "Alice")
        .await
        .expect_err("capture denial should fail the call");

    assert_eq!(err, CallError::Media(MediaError::PermissionDenied));
    settle().await;

    // Nothing was sent, nothing is held.
    assert_eq!(s.handle.call_state(), CallState::Idle);
    assert!(s.handle.local_media().is_none());
    assert!(s.channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_join_with_denied_capture_fails_before_signaling() {
    init_tracing();

    let s = scripted_session_with(FakeMedia::denied());
    let err = s
        .handle
        .join_video_call(huddle_core::RoomId::new(), "Bob")
        .await
        .expect_err("capture denial should fail the join");

    assert!(matches!(err, CallError::Media(_)));
    assert!(s.channel.sent().await.is_empty());
}
