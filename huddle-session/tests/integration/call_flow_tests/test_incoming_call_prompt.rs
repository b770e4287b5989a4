use huddle_core::{CallRoom, ParticipantId, RoomId, RoomMember, SignalEvent};
use huddle_session::CallState;

use crate::integration::{init_tracing, scripted_session, settle, wait_for};

fn ring(room_id: RoomId) -> SignalEvent {
    SignalEvent::IncomingCall {
        room: CallRoom::new(room_id, 42, RoomMember::new(ParticipantId::new(), "Alice")),
    }
}

#[tokio::test]
async fn test_accept_dismisses_prompt_and_yields_room_id() {
    init_tracing();

    let s = scripted_session();
    let room_id = RoomId::new();
    s.channel.inject(ring(room_id));

    let mut incoming = s.handle.watch_incoming_call();
    let room = wait_for(&mut incoming, |r| r.is_some())
        .await
        .expect("prompt should be set");
    assert_eq!(room.id, room_id);
    assert_eq!(room.created_by, "Alice");

    // Accepting only dismisses the prompt; joining is a separate step.
    let accepted = s.handle.accept_call().await;
    assert_eq!(accepted, Some(room_id));
    assert!(s.handle.incoming_call().is_none());
    assert_eq!(s.handle.call_state(), CallState::Idle);

    s.handle
        .join_video_call(room_id, "Bob")
        .await
        .expect("join should succeed");
    assert_eq!(s.handle.call_state(), CallState::InCall);
}

#[tokio::test]
async fn test_reject_clears_prompt_without_joining() {
    init_tracing();

    let s = scripted_session();
    s.channel.inject(ring(RoomId::new()));

    let mut incoming = s.handle.watch_incoming_call();
    wait_for(&mut incoming, |r| r.is_some()).await;

    s.handle.reject_call().await;
    wait_for(&mut incoming, |r| r.is_none()).await;

    assert_eq!(s.handle.call_state(), CallState::Idle);
    assert!(s.channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_ring_while_busy_is_ignored() {
    init_tracing();

    let s = scripted_session();
    s.handle
        .create_video_call(1, "Alice")
        .await
        .expect("call creation should succeed");

    s.channel.inject(ring(RoomId::new()));
    settle().await;

    assert!(s.handle.incoming_call().is_none());
}

#[tokio::test]
async fn test_accept_without_pending_call_returns_none() {
    init_tracing();

    let s = scripted_session();
    assert_eq!(s.handle.accept_call().await, None);
}
