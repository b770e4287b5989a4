use huddle_core::{ParticipantId, RoomMember, SignalEvent};
use huddle_session::CallState;

use crate::integration::{init_tracing, scripted_session, settle, wait_for};

#[tokio::test]
async fn test_answer_from_unknown_peer_changes_nothing() {
    init_tracing();

    let s = scripted_session();
    s.handle
        .create_video_call(1, "Alice")
        .await
        .expect("call creation should succeed");

    let bob = ParticipantId::new();
    s.channel.inject(SignalEvent::UserJoined {
        participant_id: bob,
        display_name: Some("Bob".to_string()),
        roster: vec![
            RoomMember::new(s.id, "Alice"),
            RoomMember::new(bob, "Bob"),
        ],
    });
    let roster_before = wait_for(&mut s.handle.watch_roster(), |r| r.len() == 2).await;
    let sent_before = s.channel.sent().await;

    // An answer from a participant with no link, e.g. one who left
    // while the answer was in flight.
    s.channel.inject(SignalEvent::Answer {
        from: ParticipantId::new(),
        sdp: "stale-answer".to_string(),
    });
    settle().await;

    // Observable state is byte-for-byte what it was.
    assert_eq!(s.handle.roster(), roster_before);
    assert_eq!(s.channel.sent().await, sent_before);
    assert_eq!(s.handle.call_state(), CallState::Calling);
    assert_eq!(s.connector.link_count().await, 1);

    // The live link never saw the stale description.
    let link = s.connector.link_to(bob).await.expect("link to bob");
    assert!(link.remote_descriptions.lock().await.is_empty());
}
