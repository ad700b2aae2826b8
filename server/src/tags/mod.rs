//! Tag registry: named labels that can be attached to moderation log
//! entries. Only defined tags may be applied.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::error::{db_lock_error, ApiError};
use crate::roles::permissions::{require_permission, Permissions};
use crate::state::AppState;

/// Whether a tag name exists in the registry.
pub fn is_defined(conn: &Connection, name: &str) -> Result<bool, rusqlite::Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM tag_defs WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Registry id for a tag name, if defined.
pub fn id_of(conn: &Connection, name: &str) -> Result<Option<i64>, rusqlite::Error> {
    conn.query_row("SELECT id FROM tag_defs WHERE name = ?1", [name], |row| {
        row.get(0)
    })
    .optional()
}

/// Define a tag, returning its registry id. Idempotent on name.
pub fn define(conn: &Connection, name: &str) -> Result<i64, rusqlite::Error> {
    if let Some(id) = id_of(conn, name)? {
        return Ok(id);
    }
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO tag_defs (name, created_at) VALUES (?1, ?2)",
        rusqlite::params![name, now],
    )?;
    Ok(conn.last_insert_rowid())
}

#[derive(Debug, Deserialize)]
pub struct DefineTagRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<TagResponse>,
}

/// POST /api/tags — Define a tag (requires MANAGE_TAGS).
pub async fn define_tag(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<DefineTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::MANAGE_TAGS).await?;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("tag name cannot be empty".to_string()));
    }

    let db = state.db.clone();
    let tag = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        let id = define(&conn, &name)?;
        Ok::<_, ApiError>(TagResponse { id, name })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok((StatusCode::CREATED, Json(tag)))
}

/// GET /api/tags — List defined tags.
pub async fn list_tags(
    State(state): State<AppState>,
    _claims: Claims,
) -> Result<Json<TagListResponse>, ApiError> {
    let db = state.db.clone();

    let tags = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        let mut stmt = conn.prepare("SELECT id, name FROM tag_defs ORDER BY name ASC")?;
        let rows: Vec<TagResponse> = stmt
            .query_map([], |row| {
                Ok(TagResponse {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok::<_, ApiError>(rows)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(TagListResponse { tags }))
}
