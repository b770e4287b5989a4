use crate::integration::{init_tracing, scripted_session, scripted_session_with};
use crate::utils::FakeMedia;

#[tokio::test]
async fn test_toggle_flips_between_states() {
    init_tracing();

    let s = scripted_session();
    s.handle
        .create_video_call(1, "Alice")
        .await
        .expect("call creation should succeed");

    // Tracks start enabled; the first toggle mutes.
    assert!(!s.handle.toggle_audio().await);
    assert!(s.handle.toggle_audio().await);
    assert!(!s.handle.toggle_video().await);

    // Independent flags: audio stays enabled while video is muted.
    let media = s.handle.local_media().expect("local media");
    assert!(media.track(huddle_session::TrackKind::Audio).unwrap().is_enabled());
    assert!(!media.track(huddle_session::TrackKind::Video).unwrap().is_enabled());
}

#[tokio::test]
async fn test_toggle_without_media_reports_disabled() {
    init_tracing();

    // No call, no media: toggles answer false and change nothing.
    let s = scripted_session();
    assert!(!s.handle.toggle_audio().await);
    assert!(!s.handle.toggle_video().await);
}

#[tokio::test]
async fn test_toggle_missing_video_track_reports_disabled() {
    init_tracing();

    let s = scripted_session_with(FakeMedia::without_camera());
    s.handle
        .create_video_call(1, "Alice")
        .await
        .expect("call creation should succeed");

    assert!(!s.handle.toggle_video().await);
    assert!(!s.handle.toggle_audio().await);
}
