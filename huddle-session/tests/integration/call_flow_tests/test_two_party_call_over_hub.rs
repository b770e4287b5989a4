use huddle_core::ParticipantId;
use huddle_session::{
    CallState, LinkState, PeerEvent, RemoteStream, Session, SessionConfig, SessionHandle,
    TrackKind,
};
use huddle_signaling::MemoryHub;
use std::sync::Arc;

use crate::integration::{init_tracing, wait_for};
use crate::utils::{FakeMedia, ScriptedConnector};

struct Party {
    id: ParticipantId,
    handle: SessionHandle,
    connector: ScriptedConnector,
    media: FakeMedia,
}

fn party(hub: &MemoryHub) -> Party {
    let id = ParticipantId::new();
    let connector = ScriptedConnector::new();
    let media = FakeMedia::new();
    let handle = Session::spawn(
        id,
        Arc::new(hub.channel()),
        Arc::new(media.clone()),
        Arc::new(connector.clone()),
        SessionConfig::default(),
    );
    Party {
        id,
        handle,
        connector,
        media,
    }
}

/// Full two-party flow over the in-memory hub: create, ring, join,
/// offer/answer negotiation, media attach, end. The peer transport is
/// scripted; everything else is the real stack.
#[tokio::test]
async fn test_two_party_call_end_to_end() {
    init_tracing();

    let hub = MemoryHub::new();
    let alice = party(&hub);
    let bob = party(&hub);

    // Both sides must be registered on the hub before the call rings.
    wait_for(&mut alice.handle.watch_connected(), |c| *c).await;
    wait_for(&mut bob.handle.watch_connected(), |c| *c).await;

    let room_id = alice
        .handle
        .create_video_call(42, "Alice")
        .await
        .expect("alice should create the call");

    // Bob is rung, accepts, joins.
    let ring = wait_for(&mut bob.handle.watch_incoming_call(), |r| r.is_some())
        .await
        .expect("bob should be rung");
    assert_eq!(ring.id, room_id);
    assert_eq!(ring.created_by, "Alice");

    let accepted = bob.handle.accept_call().await;
    assert_eq!(accepted, Some(room_id));
    bob.handle
        .join_video_call(room_id, "Bob")
        .await
        .expect("bob should join");

    // Both rosters converge on two entries, the local one first.
    let alice_roster = wait_for(&mut alice.handle.watch_roster(), |r| r.len() == 2).await;
    assert_eq!(alice_roster[0].id, alice.id);
    assert_eq!(alice_roster[0].name, "You");
    assert!(alice_roster[0].is_host);
    assert_eq!(alice_roster[1].id, bob.id);
    assert_eq!(alice_roster[1].name, "Bob");
    assert!(!alice_roster[1].is_host);

    let bob_roster = wait_for(&mut bob.handle.watch_roster(), |r| r.len() == 2).await;
    assert_eq!(bob_roster[0].id, bob.id);
    assert_eq!(bob_roster[0].name, "You");
    assert!(bob_roster[0].is_host);
    assert_eq!(bob_roster[1].name, "Alice");

    // Alice was already in the room, so she originates the offer; bob
    // answers without ever offering.
    let alice_link = wait_for_link(&alice.connector, bob.id).await;
    let bob_link = wait_for_link(&bob.connector, alice.id).await;

    // Bob's link saw alice's offer, alice's link saw bob's answer.
    let saw_offer = wait_for_sdp(&bob_link, "offer-for-").await;
    assert!(saw_offer, "bob should receive alice's offer");
    let saw_answer = wait_for_sdp(&alice_link, "answer-for-").await;
    assert!(saw_answer, "alice should receive bob's answer");

    // Local tracks were attached on both sides.
    assert_eq!(alice_link.tracks.lock().await.len(), 2);
    assert_eq!(bob_link.tracks.lock().await.len(), 2);

    // Transport comes up: alice's call leaves Calling.
    alice_link
        .emit(PeerEvent::StateChanged(bob.id, LinkState::Connected))
        .await;
    wait_for(&mut alice.handle.watch_call_state(), |s| {
        *s == CallState::InCall
    })
    .await;

    alice_link
        .emit(PeerEvent::TrackReceived(
            bob.id,
            RemoteStream::new("bob-stream", TrackKind::Video),
        ))
        .await;
    let roster = wait_for(&mut alice.handle.watch_roster(), |r| {
        r.len() == 2 && r[1].stream.is_some()
    })
    .await;
    assert_eq!(
        roster[1].stream.as_ref().map(|s| s.id.as_str()),
        Some("bob-stream")
    );

    // Alice hangs up; both sides land back in Idle with media released.
    alice.handle.end_call().await.expect("alice should hang up");
    wait_for(&mut alice.handle.watch_call_state(), |s| {
        *s == CallState::Idle
    })
    .await;
    wait_for(&mut bob.handle.watch_call_state(), |s| *s == CallState::Idle).await;

    assert!(alice.handle.roster().is_empty());
    assert!(bob.handle.roster().is_empty());
    assert_eq!(alice.media.stop_count(), 2);
    assert_eq!(bob.media.stop_count(), 2);
    assert!(alice_link.is_closed());
    assert!(bob_link.is_closed());
}

async fn wait_for_link(
    connector: &ScriptedConnector,
    remote: ParticipantId,
) -> crate::utils::LinkProbe {
    let deadline = tokio::time::Instant::now() + crate::integration::WAIT;
    while tokio::time::Instant::now() < deadline {
        if let Some(link) = connector.link_to(remote).await {
            return link;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("no link opened toward {remote}");
}

async fn wait_for_sdp(link: &crate::utils::LinkProbe, prefix: &str) -> bool {
    let deadline = tokio::time::Instant::now() + crate::integration::WAIT;
    while tokio::time::Instant::now() < deadline {
        if link
            .remote_descriptions
            .lock()
            .await
            .iter()
            .any(|d| d.sdp.starts_with(prefix))
        {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
