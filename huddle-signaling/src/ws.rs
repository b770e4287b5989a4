use crate::channel::SignalingChannel;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::{
    ClientSignal, IceCandidate, ParticipantId, RoomId, SessionDescription, SignalEvent,
    SignalingError,
};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, warn};

const EVENT_BUFFER: usize = 256;

/// How long to wait for the relay to acknowledge a room command.
const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Signaling channel backed by a WebSocket connection to the relay
/// server. This is the production path; the in-memory hub exists for
/// tests and local development only.
pub struct WsSignaling {
    base_url: String,
    events: broadcast::Sender<SignalEvent>,
    conn: Mutex<Option<Conn>>,
}

struct Conn {
    local: ParticipantId,
    out_tx: mpsc::UnboundedSender<WsMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl WsSignaling {
    /// `base_url` is the relay root, e.g. `ws://127.0.0.1:9400`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            base_url: base_url.into(),
            events,
            conn: Mutex::new(None),
        }
    }

    async fn send(&self, signal: &ClientSignal) -> Result<(), SignalingError> {
        let conn = self.conn.lock().await;
        let Some(conn) = conn.as_ref() else {
            return Err(SignalingError::NotConnected);
        };

        let json = serde_json::to_string(signal)
            .map_err(|e| SignalingError::Transport(e.to_string()))?;
        conn.out_tx
            .send(WsMessage::Text(json.into()))
            .map_err(|_| SignalingError::Transport("websocket writer closed".into()))
    }

    async fn local(&self) -> Result<ParticipantId, SignalingError> {
        self.conn
            .lock()
            .await
            .as_ref()
            .map(|c| c.local)
            .ok_or(SignalingError::NotConnected)
    }

    /// Wait until `check` accepts an event, or the relay reports a
    /// failure, or the ack window expires.
    async fn await_ack<F>(
        &self,
        mut rx: broadcast::Receiver<SignalEvent>,
        mut check: F,
    ) -> Result<(), SignalingError>
    where
        F: FnMut(&SignalEvent) -> Option<Result<(), SignalingError>> + Send,
    {
        let wait = timeout(ACK_TIMEOUT, async {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Some(outcome) = check(&event) {
                            return outcome;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("signal subscriber lagged by {n} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(SignalingError::Transport("event stream closed".into()));
                    }
                }
            }
        });

        match wait.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SignalingError::Transport(
                "timed out waiting for relay acknowledgement".into(),
            )),
        }
    }
}

#[async_trait]
impl SignalingChannel for WsSignaling {
    async fn connect(&self, local: ParticipantId) -> Result<(), SignalingError> {
        let mut slot = self.conn.lock().await;
        if slot.is_some() {
            debug!(%local, "connect on an already connected channel, ignoring");
            return Ok(());
        }

        let url = format!("{}/ws/{}", self.base_url.trim_end_matches('/'), local);
        let (stream, _) = connect_async(&url)
            .await
            .map_err(|e| SignalingError::Transport(e.to_string()))?;
        info!(%local, url, "signaling websocket connected");

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });

        let events = self.events.clone();
        let reader = tokio::spawn(async move {
            while let Some(msg) = source.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        match serde_json::from_str::<SignalEvent>(text.as_str()) {
                            Ok(event) => {
                                let _ = events.send(event);
                            }
                            Err(e) => warn!("invalid signal event from relay: {e}"),
                        }
                    }
                    Ok(WsMessage::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
            let _ = events.send(SignalEvent::Disconnected);
        });

        *slot = Some(Conn {
            local,
            out_tx,
            reader,
            writer,
        });
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(conn) = self.conn.lock().await.take() else {
            return;
        };
        let Conn {
            out_tx,
            reader,
            mut writer,
            ..
        } = conn;

        // Queue the close frame, then drop the sender so the writer
        // task drains the queue and exits on its own.
        let _ = out_tx.send(WsMessage::Close(None));
        drop(out_tx);
        if timeout(Duration::from_secs(1), &mut writer).await.is_err() {
            warn!("websocket writer did not drain before shutdown");
            writer.abort();
        }
        reader.abort();

        let _ = self.events.send(SignalEvent::Disconnected);
    }

    async fn create_room(
        &self,
        room_id: RoomId,
        context_id: u64,
        display_name: &str,
    ) -> Result<(), SignalingError> {
        let rx = self.events.subscribe();
        self.send(&ClientSignal::CreateRoom {
            room_id,
            context_id,
            display_name: display_name.to_string(),
        })
        .await?;

        self.await_ack(rx, |event| match event {
            SignalEvent::RoomCreated { room_id: id } if *id == room_id => Some(Ok(())),
            SignalEvent::ChannelError {
                error: error @ SignalingError::DuplicateRoom(id),
            } if *id == room_id => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    async fn join_room(&self, room_id: RoomId, display_name: &str) -> Result<(), SignalingError> {
        let local = self.local().await?;
        let rx = self.events.subscribe();
        self.send(&ClientSignal::JoinRoom {
            room_id,
            display_name: display_name.to_string(),
        })
        .await?;

        self.await_ack(rx, |event| match event {
            SignalEvent::UserJoined { participant_id, .. } if *participant_id == local => {
                Some(Ok(()))
            }
            SignalEvent::ChannelError {
                error: error @ SignalingError::RoomNotFound(id),
            } if *id == room_id => Some(Err(error.clone())),
            _ => None,
        })
        .await
    }

    async fn send_description(
        &self,
        to: ParticipantId,
        description: SessionDescription,
    ) -> Result<(), SignalingError> {
        let signal = match description.kind {
            huddle_core::SdpKind::Offer => ClientSignal::Offer {
                to,
                sdp: description.sdp,
            },
            huddle_core::SdpKind::Answer => ClientSignal::Answer {
                to,
                sdp: description.sdp,
            },
        };
        self.send(&signal).await
    }

    async fn send_candidate(
        &self,
        to: ParticipantId,
        candidate: IceCandidate,
    ) -> Result<(), SignalingError> {
        self.send(&ClientSignal::IceCandidate { to, candidate }).await
    }

    async fn end_call(&self) -> Result<(), SignalingError> {
        self.send(&ClientSignal::EndCall).await
    }

    fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.events.subscribe()
    }
}
