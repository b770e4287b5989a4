use crate::server::RelayService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientSignal, ParticipantId};
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(participant_id): Path<String>,
    State(service): State<RelayService>,
) -> impl IntoResponse {
    let Ok(participant_id) = ParticipantId::parse(&participant_id) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, participant_id, service))
        .into_response()
}

async fn handle_socket(socket: WebSocket, participant_id: ParticipantId, service: RelayService) {
    info!(%participant_id, "new signaling connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(participant_id, tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientSignal>(&text) {
                        Ok(signal) => service.handle_signal(participant_id, signal),
                        Err(e) => warn!(%participant_id, "invalid client signal: {e}"),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(participant_id);
    info!(%participant_id, "signaling connection closed");
}
