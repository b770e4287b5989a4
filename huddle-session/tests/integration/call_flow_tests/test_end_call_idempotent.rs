use huddle_core::{RoomMember, SignalEvent};
use huddle_session::{CallState, PeerEvent, RemoteStream, TrackKind};

use crate::integration::{init_tracing, scripted_session, settle, wait_for};
use crate::utils::SentSignal;

#[tokio::test]
async fn test_end_call_tears_down_exactly_once() {
    init_tracing();

    let s = scripted_session();
    s.handle
        .create_video_call(1, "Alice")
        .await
        .expect("call creation should succeed");

    // Bring a peer up so teardown has a link and a stream to release.
    let bob = huddle_core::ParticipantId::new();
    s.channel.inject(SignalEvent::UserJoined {
        participant_id: bob,
        display_name: Some("Bob".to_string()),
        roster: vec![
            RoomMember::new(s.id, "Alice"),
            RoomMember::new(bob, "Bob"),
        ],
    });
    let mut roster = s.handle.watch_roster();
    wait_for(&mut roster, |r| r.len() == 2).await;

    let link = s.connector.link_to(bob).await.expect("link to bob");
    link.emit(PeerEvent::TrackReceived(
        bob,
        RemoteStream::new("bob-stream".to_string(), TrackKind::Video),
    ))
    .await;
    let mut streams = s.handle.watch_remote_streams();
    wait_for(&mut streams, |m| m.contains_key(&bob)).await;

    s.handle.end_call().await.expect("end should succeed");
    s.handle.end_call().await.expect("second end is a no-op");

    assert_eq!(s.handle.call_state(), CallState::Idle);
    assert!(s.handle.local_media().is_none());
    assert!(s.handle.roster().is_empty());
    assert!(s.handle.remote_streams().is_empty());
    assert!(link.is_closed());

    // Both local tracks stopped once, and only one end reached the
    // channel.
    assert_eq!(s.media.stop_count(), 2);
    let ends = s
        .channel
        .sent_count(|sig| matches!(sig, SentSignal::EndCall))
        .await;
    assert_eq!(ends, 1);
}

#[tokio::test]
async fn test_end_call_while_idle_is_a_noop() {
    init_tracing();

    let s = scripted_session();
    s.handle.end_call().await.expect("idle end should succeed");
    settle().await;

    assert_eq!(s.handle.call_state(), CallState::Idle);
    assert!(s.channel.sent().await.is_empty());
}
