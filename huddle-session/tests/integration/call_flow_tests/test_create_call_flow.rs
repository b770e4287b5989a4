use huddle_session::{CallError, CallState, TrackKind};

use crate::integration::{init_tracing, scripted_session, wait_for};
use crate::utils::SentSignal;

#[tokio::test]
async fn test_create_call_registers_room_and_publishes_roster() {
    init_tracing();

    let s = scripted_session();
    let mut call_state = s.handle.watch_call_state();

    let room_id = s
        .handle
        .create_video_call(42, "Alice")
        .await
        .expect("call creation should succeed");

    wait_for(&mut call_state, |state| *state == CallState::Calling).await;

    let sent = s.channel.sent().await;
    assert_eq!(
        sent,
        vec![SentSignal::CreateRoom {
            room_id,
            context_id: 42,
            display_name: "Alice".to_string(),
        }]
    );

    // Alone in the room: the roster is just the local entry.
    let roster = s.handle.roster();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id, s.id);
    assert_eq!(roster[0].name, "You");
    assert!(roster[0].is_host);
    assert!(roster[0].stream.is_none());

    let media = s.handle.local_media().expect("local media should be live");
    assert!(media.has(TrackKind::Audio));
    assert!(media.has(TrackKind::Video));
}

#[tokio::test]
async fn test_create_while_calling_is_rejected() {
    init_tracing();

    let s = scripted_session();
    s.handle
        .create_video_call(1, "Alice")
        .await
        .expect("first call should succeed");

    let err = s
        .handle
        .create_video_call(2, "Alice")
        .await
        .expect_err("second call should be rejected");
    assert!(matches!(err, CallError::InvalidState(CallState::Calling)));

    // The rejected attempt never reached the channel.
    let creates = s
        .channel
        .sent_count(|sig| matches!(sig, SentSignal::CreateRoom { .. }))
        .await;
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_rejected_room_creation_reverts_to_idle() {
    init_tracing();

    let s = scripted_session();
    s.channel.reject_create_room();

    let err = s
        .handle
        .create_video_call(7, "Alice")
        .await
        .expect_err("creation should be rejected by the channel");
    assert!(matches!(err, CallError::Signaling(_)));

    assert_eq!(s.handle.call_state(), CallState::Idle);
    assert!(s.handle.local_media().is_none());
    // Media acquired for the attempt was released again.
    assert_eq!(s.media.stop_count(), 2);
}
