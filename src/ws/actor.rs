use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::handler::CLOSE_SUPERSEDED;
use crate::ws::protocol::{self, ServerEnvelope};

/// Run the actor-per-connection pattern for an identified chat connection.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader loop: processes incoming frames, dispatches to the protocol
///   handler
///
/// The mpsc channel allows any part of the system to send messages to this
/// client by cloning the sender held in the registry.
pub async fn run_connection(socket: WebSocket, state: AppState, email: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    let conn_id = Uuid::now_v7();

    // Register, displacing any previous connection for this email. The
    // displaced socket is closed rather than left orphaned.
    if let Some(superseded) = state.connections.register(&email, conn_id, tx.clone()) {
        tracing::info!(email = %email, "closing superseded connection");
        let _ = superseded.send(Message::Close(Some(CloseFrame {
            code: CLOSE_SUPERSEDED,
            reason: "superseded by a newer connection".into(),
        })));
    }

    // Confirm the identifier the participant is now reachable under.
    protocol::send_envelope(
        &tx,
        &ServerEnvelope::Status {
            message: format!("connected as {}", email),
        },
    );

    tracing::info!(email = %email, "chat actor started");

    // Spawn writer task: forwards mpsc messages to the WebSocket sink.
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Reader loop: the await on the next frame is the sole suspension point;
    // the registry is never locked across it. Malformed input is reported to
    // this sender only — the loop ends solely on transport-level
    // disconnection.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_frame(text.as_str(), &email, &tx, &state.connections);
                }
                Message::Binary(_) => {
                    tracing::debug!(email = %email, "received binary frame on text protocol");
                    protocol::send_error(&tx, "expected a text frame");
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Pong(_) => {}
                Message::Close(frame) => {
                    tracing::info!(email = %email, reason = ?frame, "client initiated close");
                    break;
                }
            },
            Some(Err(err)) => {
                tracing::warn!(email = %email, error = %err, "websocket receive error");
                break;
            }
            None => {
                tracing::info!(email = %email, "websocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();

    // Guarded removal: if this connection was superseded while the loop ran,
    // the entry now belongs to the replacement and stays.
    state.connections.unregister(&email, conn_id);

    tracing::info!(email = %email, "chat actor stopped");
}

/// Writer task: receives messages from the mpsc channel and forwards them to
/// the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
