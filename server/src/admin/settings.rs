use axum::{extract::State, Json};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::error::{db_lock_error, ApiError};
use crate::roles::permissions::{require_permission, Permissions};
use crate::state::AppState;

/// Public server info response (visible to anyone)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerInfoResponse {
    pub name: String,
    pub description: String,
    pub registration_mode: String,
    pub version: String,
}

/// Admin-only settings update request
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub registration_mode: Option<String>,
}

/// Read a single server setting, if present.
pub fn get_setting(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT value FROM server_settings WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .ok()
}

fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO server_settings (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// GET /api/server/info — Public endpoint, no auth required.
pub async fn get_server_info(
    State(state): State<AppState>,
) -> Result<Json<ServerInfoResponse>, ApiError> {
    let db = state.db.clone();
    let configured_mode = state.registration_mode.clone();

    let info = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        Ok::<_, ApiError>(ServerInfoResponse {
            name: get_setting(&conn, "name").unwrap_or_else(|| "LOREKEEP".to_string()),
            description: get_setting(&conn, "description").unwrap_or_default(),
            registration_mode: get_setting(&conn, "registration_mode")
                .unwrap_or(configured_mode),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(info))
}

/// PUT /api/server/settings — Update server settings (requires ADMIN).
/// A registration_mode change takes effect on the next registration attempt.
pub async fn update_server_settings(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<ServerInfoResponse>, ApiError> {
    require_permission(&state.db, claims.sub, claims.is_owner, Permissions::ADMIN).await?;

    if let Some(mode) = &req.registration_mode {
        if mode != "open" && mode != "closed" {
            return Err(ApiError::BadRequest(
                "registration_mode must be \"open\" or \"closed\"".to_string(),
            ));
        }
    }

    let db = state.db.clone();
    let configured_mode = state.registration_mode.clone();

    let info = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        if let Some(name) = &req.name {
            set_setting(&conn, "name", name)?;
        }
        if let Some(description) = &req.description {
            set_setting(&conn, "description", description)?;
        }
        if let Some(mode) = &req.registration_mode {
            set_setting(&conn, "registration_mode", mode)?;
        }

        Ok::<_, ApiError>(ServerInfoResponse {
            name: get_setting(&conn, "name").unwrap_or_else(|| "LOREKEEP".to_string()),
            description: get_setting(&conn, "description").unwrap_or_default(),
            registration_mode: get_setting(&conn, "registration_mode")
                .unwrap_or(configured_mode),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    Ok(Json(info))
}
