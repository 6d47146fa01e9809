use std::sync::Arc;

use crate::store::Store;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// In-memory record store (users, tasks, file records)
    pub store: Store,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Live chat connections keyed by participant email
    pub connections: Arc<ConnectionRegistry>,
    /// Directory uploaded attachments are written to
    pub upload_dir: String,
    /// Maximum accepted upload size in megabytes
    pub max_upload_size_mb: u32,
}
