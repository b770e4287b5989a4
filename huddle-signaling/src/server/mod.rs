//! Production signaling backend: an axum WebSocket relay that keeps
//! room membership and forwards offers, answers, and candidates
//! between connected participants.

mod service;
mod ws_handler;

pub use service::RelayService;
pub use ws_handler::ws_handler;

use axum::Router;
use axum::routing::get;

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route("/ws/{participant_id}", get(ws_handler))
        .with_state(service)
}
