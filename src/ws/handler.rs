use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for the chat endpoint. The email is the participant
/// identifier the connection gets registered under.
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// WebSocket close codes:
/// 1008 = policy violation (no identifier supplied at connect time)
/// 4000 = superseded by a newer connection for the same identifier
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;
pub const CLOSE_SUPERSEDED: u16 = 4000;

/// GET /ws/chat?email=<identifier>
/// WebSocket upgrade endpoint. The identifier is the one validated
/// precondition: when it is missing or empty the upgrade completes and the
/// socket is immediately closed with a policy-violation frame, without
/// touching the registry. Otherwise the connection is handed to the actor.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<ChatQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match params.email.filter(|email| !email.trim().is_empty()) {
        Some(email) => {
            tracing::info!(email = %email, "chat connection accepted");
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, email))
        }
        None => {
            tracing::warn!("chat connection rejected: no email supplied");
            ws.on_upgrade(|mut socket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_POLICY_VIOLATION,
                    reason: "email query parameter is required".into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}
