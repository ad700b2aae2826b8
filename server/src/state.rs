use crate::audit::AuditSink;
use crate::db::DbPool;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Registration mode from config; server_settings may override at runtime
    pub registration_mode: String,
    /// Audit sink, carrying the configured tag storage mode
    pub audit: AuditSink,
}
