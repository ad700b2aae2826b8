//! Moderation audit log. Every successful block or unblock appends exactly
//! one entry; failed attempts append nothing.

use axum::{extract::State, Json};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::error::{db_lock_error, ApiError};
use crate::roles::permissions::{require_permission, Permissions};
use crate::state::AppState;

/// How tag rows are written alongside audit entries. The registry is being
/// moved from inline names to normalized tag_defs references; `Dual` writes
/// both during the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TagStorage {
    Inline,
    #[default]
    Dual,
    Normalized,
}

/// One completed moderation action, ready to be appended.
#[derive(Debug)]
pub struct AuditRecord<'a> {
    pub action: &'a str,
    pub actor_id: i64,
    pub target_id: i64,
    pub reason: &'a str,
    /// Deduplicated by the caller before reaching the sink.
    pub tags: &'a [String],
}

/// Append-only sink for audit entries. The tag storage mode is an explicit
/// constructor argument, not a process-wide flag.
#[derive(Debug, Clone)]
pub struct AuditSink {
    tag_storage: TagStorage,
}

impl AuditSink {
    pub fn new(tag_storage: TagStorage) -> Self {
        Self { tag_storage }
    }

    /// Append one entry plus its tag rows. Returns the entry id.
    pub fn append(&self, conn: &Connection, rec: &AuditRecord) -> Result<String, rusqlite::Error> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let reason = if rec.reason.is_empty() {
            None
        } else {
            Some(rec.reason)
        };

        conn.execute(
            "INSERT INTO audit_log (id, action, actor_id, target_id, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id, rec.action, rec.actor_id, rec.target_id, reason, now],
        )?;

        for tag in rec.tags {
            let tag_name = match self.tag_storage {
                TagStorage::Inline | TagStorage::Dual => Some(tag.as_str()),
                TagStorage::Normalized => None,
            };
            let tag_id = match self.tag_storage {
                TagStorage::Dual | TagStorage::Normalized => crate::tags::id_of(conn, tag)?,
                TagStorage::Inline => None,
            };
            conn.execute(
                "INSERT INTO audit_log_tags (log_id, tag_name, tag_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, tag_name, tag_id],
            )?;
        }

        Ok(id)
    }
}

#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: String,
    pub action: String,
    pub actor_id: i64,
    pub target_id: i64,
    pub reason: String,
    pub tags: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct AuditLogResponse {
    pub entries: Vec<AuditEntryResponse>,
}

/// GET /api/moderation/log — List audit entries, newest first
/// (requires BLOCK_USERS). Tag names are resolved from either storage form.
pub async fn list_log(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<AuditLogResponse>, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::BLOCK_USERS).await?;

    let db = state.db.clone();

    let entries = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        let mut stmt = conn.prepare(
            "SELECT id, action, actor_id, target_id, reason, created_at
             FROM audit_log ORDER BY created_at DESC",
        )?;
        let mut entries: Vec<AuditEntryResponse> = stmt
            .query_map([], |row| {
                Ok(AuditEntryResponse {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    actor_id: row.get(2)?,
                    target_id: row.get(3)?,
                    reason: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    tags: Vec::new(),
                    created_at: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        let mut tag_stmt = conn.prepare(
            "SELECT COALESCE(alt.tag_name, td.name)
             FROM audit_log_tags alt
             LEFT JOIN tag_defs td ON td.id = alt.tag_id
             WHERE alt.log_id = ?1",
        )?;
        for entry in &mut entries {
            entry.tags = tag_stmt
                .query_map([&entry.id], |row| row.get::<_, Option<String>>(0))?
                .filter_map(|r| r.ok().flatten())
                .collect();
        }

        Ok::<_, ApiError>(entries)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(AuditLogResponse { entries }))
}
