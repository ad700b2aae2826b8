use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::middleware::Claims;
use crate::error::{db_lock_error, ApiError};
use crate::roles::permissions::{require_permission, Permissions};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: i64,
    pub role_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveRoleRequest {
    pub user_id: i64,
    pub role_id: String,
}

/// POST /api/roles/assign — Add a user to a rights group (requires ADMIN).
pub async fn assign_role(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<AssignRoleRequest>,
) -> Result<StatusCode, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::ADMIN).await?;

    let db = state.db.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        if crate::users::find_by_id(&conn, req.user_id)?.is_none() {
            return Err(ApiError::UserNotFound);
        }

        let role_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) FROM roles WHERE id = ?1",
                [&req.role_id],
                |row| row.get::<_, i64>(0).map(|c| c > 0),
            )
            .unwrap_or(false);
        if !role_exists {
            return Err(ApiError::RoleNotFound);
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id, assigned_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![req.user_id, req.role_id, now],
        )?;

        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(StatusCode::OK)
}

/// POST /api/roles/remove — Remove a user from a rights group (requires ADMIN).
pub async fn remove_role(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<RemoveRoleRequest>,
) -> Result<StatusCode, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::ADMIN).await?;

    let db = state.db.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        conn.execute(
            "DELETE FROM user_roles WHERE user_id = ?1 AND role_id = ?2",
            rusqlite::params![req.user_id, req.role_id],
        )?;
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(StatusCode::OK)
}
