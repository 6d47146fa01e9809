pub mod actor;
pub mod handler;
pub mod protocol;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific
/// client; the connection's writer task drains it into the socket, so a send
/// never waits on the peer's own receive loop.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// A registered connection: the outbound sender tagged with the id of the
/// connection that owns the entry.
struct Peer {
    conn_id: Uuid,
    tx: ConnectionSender,
}

/// Connection registry: tracks the live chat connection per participant
/// email. At most one entry per identifier; registering again replaces the
/// entry and hands the superseded sender back to the caller. Constructed
/// once at startup and shared through `AppState`.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: DashMap<String, Peer>,
}

impl ConnectionRegistry {
    /// Create a new empty connection registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `email -> connection`, replacing any prior entry for that
    /// email. Returns the superseded connection's sender, if there was one,
    /// so the caller can close it.
    pub fn register(&self, email: &str, conn_id: Uuid, tx: ConnectionSender) -> Option<ConnectionSender> {
        let prior = self.peers.insert(email.to_string(), Peer { conn_id, tx });

        tracing::debug!(
            email = %email,
            connections = self.peers.len(),
            "connection registered"
        );

        prior.map(|peer| peer.tx)
    }

    /// Remove the entry for `email` if it is still owned by `conn_id`.
    /// No-op when absent or when the entry has since been superseded by a
    /// newer connection. Idempotent.
    pub fn unregister(&self, email: &str, conn_id: Uuid) {
        let removed = self.peers.remove_if(email, |_, peer| peer.conn_id == conn_id);

        if removed.is_some() {
            tracing::debug!(email = %email, "connection unregistered");
        }
    }

    /// Route a message to `email`'s live connection. Returns `true` when the
    /// write was accepted. A failed write means the channel is closed
    /// underneath: the entry is evicted as an implicit disconnect and the
    /// call returns `false`. An unknown identifier returns `false` with no
    /// side effects.
    pub fn send_to(&self, email: &str, message: Message) -> bool {
        let failed_conn = {
            let Some(peer) = self.peers.get(email) else {
                return false;
            };
            match peer.tx.send(message) {
                Ok(()) => return true,
                Err(_) => peer.conn_id,
            }
        };

        // Evict only the connection that failed; a replacement may have been
        // registered in the meantime.
        self.peers.remove_if(email, |_, peer| peer.conn_id == failed_conn);
        tracing::debug!(email = %email, "dead connection evicted on failed send");
        false
    }

    /// Whether `email` currently has a live entry.
    pub fn contains(&self, email: &str) -> bool {
        self.peers.contains_key(email)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
