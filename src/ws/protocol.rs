use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::ws::{ConnectionRegistry, ConnectionSender};

/// Server-to-client frame, serialized as a JSON object tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// Informational notice, e.g. the post-connect greeting.
    Status { message: String },
    /// A chat message delivered to its receiver.
    ReceivedMessage { sender: String, content: String },
    /// Echo of a sent message back to its sender.
    OwnMessage { recipient: String, content: String },
    /// Malformed input or failed delivery, reported to the sender only.
    Error { message: String },
}

/// Inbound client frame: `{"username": <receiver>, "message": <content>}`.
/// Fields default to empty so shape validation can tell a missing field
/// apart from unparseable JSON.
#[derive(Debug, Default, Deserialize)]
pub struct ClientFrame {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub message: String,
}

/// Serialize an envelope and push it onto a connection's outbound channel.
pub fn send_envelope(tx: &ConnectionSender, envelope: &ServerEnvelope) {
    if let Ok(json) = serde_json::to_string(envelope) {
        let _ = tx.send(Message::Text(json.into()));
    }
}

/// Report an error to the sender. Never closes the connection.
pub fn send_error(tx: &ConnectionSender, message: impl Into<String>) {
    send_envelope(
        tx,
        &ServerEnvelope::Error {
            message: message.into(),
        },
    );
}

/// Handle one inbound text frame from `sender_email`.
///
/// Parse and validation failures are reported back on `tx` and leave the
/// registry untouched. A well-formed frame is routed to its receiver; the
/// sender always gets an `own_message` echo, preceded by an `error` when the
/// receiver is unknown or its connection turned out to be gone.
pub fn handle_text_frame(
    text: &str,
    sender_email: &str,
    tx: &ConnectionSender,
    registry: &ConnectionRegistry,
) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(sender = %sender_email, error = %err, "discarding malformed frame");
            send_error(tx, "malformed JSON payload");
            return;
        }
    };

    let frame: ClientFrame = match serde_json::from_value(value) {
        Ok(frame) => frame,
        Err(_) => {
            send_error(
                tx,
                "invalid message format: expected {\"username\": ..., \"message\": ...}",
            );
            return;
        }
    };
    if frame.username.is_empty() || frame.message.is_empty() {
        send_error(
            tx,
            "invalid message format: expected {\"username\": ..., \"message\": ...}",
        );
        return;
    }

    let delivery = ServerEnvelope::ReceivedMessage {
        sender: sender_email.to_string(),
        content: frame.message.clone(),
    };
    let delivered = match serde_json::to_string(&delivery) {
        Ok(json) => registry.send_to(&frame.username, Message::Text(json.into())),
        Err(_) => false,
    };
    if !delivered {
        send_error(tx, format!("{} is not connected", frame.username));
    }

    // The sender's own UI reflects what was sent even when delivery failed.
    send_envelope(
        tx,
        &ServerEnvelope::OwnMessage {
            recipient: frame.username,
            content: frame.message,
        },
    );
}
