use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::Claims;
use crate::error::{db_lock_error, ApiError};
use crate::roles::permissions::{require_permission, Permissions};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub permissions: u32,
    pub is_default: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleListResponse {
    pub roles: Vec<RoleResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub permissions: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub permissions: Option<u32>,
}

/// GET /api/roles — List all rights groups.
pub async fn list_roles(
    State(state): State<AppState>,
    _claims: Claims,
) -> Result<Json<RoleListResponse>, ApiError> {
    let db = state.db.clone();

    let roles = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        let mut stmt = conn.prepare(
            "SELECT id, name, permissions, is_default FROM roles ORDER BY created_at ASC",
        )?;

        let rows: Vec<RoleResponse> = stmt
            .query_map([], |row| {
                Ok(RoleResponse {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    permissions: row.get::<_, u32>(2)?,
                    is_default: row.get::<_, bool>(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok::<_, ApiError>(rows)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(RoleListResponse { roles }))
}

/// POST /api/roles — Create a new rights group (requires ADMIN).
pub async fn create_role(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::ADMIN).await?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("role name cannot be empty".to_string()));
    }

    let db = state.db.clone();
    let name = req.name.clone();
    let permissions = req.permissions;

    let role = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO roles (id, name, permissions, is_default, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            rusqlite::params![id, name, permissions, now],
        )?;

        Ok::<_, ApiError>(RoleResponse {
            id,
            name,
            permissions,
            is_default: false,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok((StatusCode::CREATED, Json(role)))
}

/// PUT /api/roles/{id} — Update a rights group (requires ADMIN).
/// Permission edits take effect on the next request for every member —
/// rights are re-read per call, never cached in tokens.
pub async fn update_role(
    State(state): State<AppState>,
    claims: Claims,
    Path(role_id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::ADMIN).await?;

    let db = state.db.clone();

    let role = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        let (name, permissions, is_default): (String, u32, bool) = conn
            .query_row(
                "SELECT name, permissions, is_default FROM roles WHERE id = ?1",
                [&role_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|_| ApiError::RoleNotFound)?;

        let name = req.name.unwrap_or(name);
        let permissions = req.permissions.unwrap_or(permissions);
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "UPDATE roles SET name = ?1, permissions = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![name, permissions, now, role_id],
        )?;

        Ok::<_, ApiError>(RoleResponse {
            id: role_id,
            name,
            permissions,
            is_default,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(role))
}

/// DELETE /api/roles/{id} — Delete a rights group (requires ADMIN).
/// The default group cannot be deleted.
pub async fn delete_role(
    State(state): State<AppState>,
    claims: Claims,
    Path(role_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::ADMIN).await?;

    let db = state.db.clone();

    tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        let is_default: bool = conn
            .query_row(
                "SELECT is_default FROM roles WHERE id = ?1",
                [&role_id],
                |row| row.get(0),
            )
            .map_err(|_| ApiError::RoleNotFound)?;

        if is_default {
            return Err(ApiError::BadRequest(
                "the default role cannot be deleted".to_string(),
            ));
        }

        conn.execute("DELETE FROM user_roles WHERE role_id = ?1", [&role_id])?;
        conn.execute("DELETE FROM roles WHERE id = ?1", [&role_id])?;

        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(StatusCode::NO_CONTENT)
}
