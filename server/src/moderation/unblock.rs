//! The unblock decision kernel: resolve the target block, authorize the
//! actor, remove the block, append the audit entry.

use std::collections::BTreeSet;

use axum::{extract::State, Json};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditRecord, AuditSink};
use crate::auth::middleware::Claims;
use crate::db::models::Block;
use crate::error::{db_lock_error, ApiError};
use crate::moderation::store;
use crate::roles::permissions::{self, Permissions};
use crate::state::AppState;
use crate::users;

/// How the caller names the block to remove: by the target's username, by
/// their numeric user id, or by the block's own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    ByName(String),
    ByUserId(i64),
    ByBlockId(i64),
}

/// The requesting user, as the kernel sees them. Token validation has
/// already happened at the extractor layer.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub is_owner: bool,
}

#[derive(Debug, Deserialize)]
pub struct UnblockRequest {
    pub user: Option<String>,
    pub userid: Option<i64>,
    pub id: Option<i64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl UnblockRequest {
    fn target(&self) -> Result<TargetRef, ApiError> {
        match (&self.user, self.userid, self.id) {
            (Some(name), None, None) => Ok(TargetRef::ByName(name.clone())),
            (None, Some(user_id), None) => Ok(TargetRef::ByUserId(user_id)),
            (None, None, Some(block_id)) => Ok(TargetRef::ByBlockId(block_id)),
            _ => Err(ApiError::BadRequest(
                "exactly one of user, userid, id must be given".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnblockResponse {
    pub id: i64,
    pub user_id: i64,
}

/// Trim, drop empties, collapse duplicates. Tag order is irrelevant to the
/// audit log, so a sorted set is fine.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    let set: BTreeSet<String> = raw
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    set.into_iter().collect()
}

/// Run the unblock decision for one request. Runs entirely under one
/// connection lock, so the removal is atomic with the checks that justify
/// it: of two racing requests for the same block, one succeeds and one
/// observes BlockNotFound.
pub fn perform_unblock(
    conn: &Connection,
    sink: &AuditSink,
    actor: &Actor,
    target: &TargetRef,
    reason: &str,
    raw_tags: &[String],
) -> Result<Block, ApiError> {
    // Resolve. An unknown username, an unknown block id, and a user with no
    // active block all mean the same thing to the caller: nothing to unblock.
    // An unknown numeric user id is reported as such, with the id.
    let block = match target {
        TargetRef::ByName(name) => match users::find_by_username(conn, name)? {
            Some(user) => store::find_by_user(conn, user.id)?,
            None => None,
        },
        TargetRef::ByUserId(user_id) => {
            if users::find_by_id(conn, *user_id)?.is_none() {
                return Err(ApiError::NoSuchUserId(*user_id));
            }
            store::find_by_user(conn, *user_id)?
        }
        TargetRef::ByBlockId(block_id) => store::find_by_id(conn, *block_id)?,
    }
    .ok_or(ApiError::BlockNotFound)?;

    // Authorize. Rights are re-read from the role tables on every request.
    let perms = permissions::user_permissions(conn, actor.id, actor.is_owner)?;
    if !perms.contains(Permissions::BLOCK_USERS) {
        return Err(ApiError::PermissionDenied);
    }

    // A blocked actor may still act in exactly one case: removing their own block.
    if block.user_id != actor.id && store::find_by_user(conn, actor.id)?.is_some() {
        return Err(ApiError::ActorBlocked);
    }

    let applied_tags = normalize_tags(raw_tags);
    if !applied_tags.is_empty() {
        for tag in &applied_tags {
            if !crate::tags::is_defined(conn, tag)? {
                return Err(ApiError::UndefinedTag(tag.clone()));
            }
        }
        // The self-unblock exemption does not extend to tagging
        if !perms.contains(Permissions::APPLY_TAGS) {
            return Err(ApiError::TagPermissionDenied);
        }
    }

    // Remove. Losing the race means another request already resolved it.
    if !store::remove(conn, block.id)? {
        return Err(ApiError::BlockNotFound);
    }

    // The removal has committed; a failed audit append is logged, not rolled back.
    let record = AuditRecord {
        action: "unblock",
        actor_id: actor.id,
        target_id: block.user_id,
        reason,
        tags: &applied_tags,
    };
    if let Err(e) = sink.append(conn, &record) {
        tracing::warn!("audit append failed after removing block {}: {}", block.id, e);
    }

    Ok(block)
}

/// POST /api/moderation/unblock — Remove a user block (requires BLOCK_USERS;
/// a blocked moderator may still remove their own block).
pub async fn unblock_user(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UnblockRequest>,
) -> Result<Json<UnblockResponse>, ApiError> {
    let target = req.target()?;
    let actor = Actor {
        id: claims.sub,
        is_owner: claims.is_owner,
    };
    let db = state.db.clone();
    let sink = state.audit.clone();

    let removed = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        perform_unblock(&conn, &sink, &actor, &target, &req.reason, &req.tags)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(UnblockResponse {
        id: removed.id,
        user_id: removed.user_id,
    }))
}
