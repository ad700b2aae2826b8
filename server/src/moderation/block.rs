use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::audit::AuditRecord;
use crate::auth::middleware::Claims;
use crate::error::{db_lock_error, ApiError};
use crate::moderation::store::{self, StoreError};
use crate::moderation::unblock::normalize_tags;
use crate::roles::permissions::{self, require_permission, Permissions};
use crate::state::AppState;
use crate::users;

#[derive(Debug, Deserialize)]
pub struct BlockRequest {
    pub user: Option<String>,
    pub userid: Option<i64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct BlockInfoResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub blocked_by: i64,
    pub reason: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct BlockListResponse {
    pub blocks: Vec<BlockInfoResponse>,
}

/// POST /api/moderation/block — Place a block on a user (requires BLOCK_USERS).
/// The owner cannot be blocked, and a blocked moderator cannot place blocks.
pub async fn block_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<BlockRequest>,
) -> Result<Json<BlockResponse>, ApiError> {
    let db = state.db.clone();
    let sink = state.audit.clone();
    let actor_id = claims.sub;
    let actor_is_owner = claims.is_owner;

    let response = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        let target = match (&req.user, req.userid) {
            (Some(name), None) => {
                users::find_by_username(&conn, name)?.ok_or(ApiError::UserNotFound)?
            }
            (None, Some(user_id)) => {
                users::find_by_id(&conn, user_id)?.ok_or(ApiError::NoSuchUserId(user_id))?
            }
            _ => {
                return Err(ApiError::BadRequest(
                    "exactly one of user, userid must be given".to_string(),
                ))
            }
        };
        if target.is_owner {
            return Err(ApiError::CannotBlockOwner);
        }

        let perms = permissions::user_permissions(&conn, actor_id, actor_is_owner)?;
        if !perms.contains(Permissions::BLOCK_USERS) {
            return Err(ApiError::PermissionDenied);
        }
        if store::find_by_user(&conn, actor_id)?.is_some() {
            return Err(ApiError::ActorBlocked);
        }

        let applied_tags = normalize_tags(&req.tags);
        if !applied_tags.is_empty() {
            for tag in &applied_tags {
                if !crate::tags::is_defined(&conn, tag)? {
                    return Err(ApiError::UndefinedTag(tag.clone()));
                }
            }
            if !perms.contains(Permissions::APPLY_TAGS) {
                return Err(ApiError::TagPermissionDenied);
            }
        }

        let reason = if req.reason.is_empty() {
            None
        } else {
            Some(req.reason.as_str())
        };
        let block_id = store::insert(&conn, target.id, actor_id, reason).map_err(|e| match e {
            StoreError::AlreadyBlocked => ApiError::AlreadyBlocked,
            StoreError::Db(e) => e.into(),
        })?;

        let record = AuditRecord {
            action: "block",
            actor_id,
            target_id: target.id,
            reason: &req.reason,
            tags: &applied_tags,
        };
        if let Err(e) = sink.append(&conn, &record) {
            tracing::warn!("audit append failed after placing block {}: {}", block_id, e);
        }

        Ok::<_, ApiError>(BlockResponse {
            id: block_id,
            user_id: target.id,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(response))
}

/// GET /api/moderation/blocks — List active blocks (requires BLOCK_USERS).
pub async fn list_blocks(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<BlockListResponse>, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::BLOCK_USERS).await?;

    let db = state.db.clone();

    let blocks = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        let mut stmt = conn.prepare(
            "SELECT b.id, b.user_id, u.username, b.blocked_by, b.reason, b.created_at
             FROM blocks b
             INNER JOIN users u ON u.id = b.user_id
             ORDER BY b.created_at ASC",
        )?;

        let blocks: Vec<BlockInfoResponse> = stmt
            .query_map([], |row| {
                Ok(BlockInfoResponse {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    username: row.get(2)?,
                    blocked_by: row.get(3)?,
                    reason: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    created_at: row.get(5)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, ApiError>(blocks)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(BlockListResponse { blocks }))
}
