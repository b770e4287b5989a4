use huddle_core::{ParticipantId, RoomId, SdpKind, SignalEvent};

use crate::integration::{init_tracing, scripted_session, settle};
use crate::utils::SentSignal;

#[tokio::test]
async fn test_incoming_offer_is_answered() {
    init_tracing();

    let s = scripted_session();
    s.handle
        .join_video_call(RoomId::new(), "Bob")
        .await
        .expect("join should succeed");

    let alice = ParticipantId::new();
    s.channel.inject(SignalEvent::Offer {
        from: alice,
        sdp: "remote-offer".to_string(),
    });
    settle().await;

    // A link toward the offerer was opened and saw the offer.
    let link = s.connector.link_to(alice).await.expect("link to alice");
    let remotes = link.remote_descriptions.lock().await.clone();
    assert_eq!(remotes.len(), 1);
    assert_eq!(remotes[0].kind, SdpKind::Offer);
    assert_eq!(remotes[0].sdp, "remote-offer");

    // And exactly one answer went back.
    let answers = s
        .channel
        .sent_count(|sig| {
            matches!(
                sig,
                SentSignal::Description { to, description }
                    if *to == alice && description.kind == SdpKind::Answer
            )
        })
        .await;
    assert_eq!(answers, 1);
}

#[tokio::test]
async fn test_offer_outside_a_call_is_ignored() {
    init_tracing();

    let s = scripted_session();
    s.channel.inject(SignalEvent::Offer {
        from: ParticipantId::new(),
        sdp: "remote-offer".to_string(),
    });
    settle().await;

    assert_eq!(s.connector.link_count().await, 0);
    assert!(s.channel.sent().await.is_empty());
}
