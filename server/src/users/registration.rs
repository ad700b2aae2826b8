use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::admin::{settings, setup};
use crate::auth::jwt;
use crate::error::{db_lock_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Account name, unique per server
    pub username: String,
    /// Optional display name (defaults to the username)
    #[serde(default)]
    pub display_name: String,
    /// Optional: setup token for admin bootstrap (first user becomes owner)
    #[serde(default)]
    pub setup_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub access_token: String,
    pub is_owner: bool,
}

fn valid_username(name: &str) -> bool {
    (3..=32).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// POST /api/auth/register
/// Create a new account. If a valid setup token is provided, the account
/// becomes the server owner. When registration is closed, only the setup
/// token path is allowed.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if !valid_username(&req.username) {
        return Err(ApiError::BadRequest(
            "username must be 3-32 characters of [A-Za-z0-9_-]".to_string(),
        ));
    }

    let db = state.db.clone();
    let username = req.username.clone();
    let display_name = if req.display_name.trim().is_empty() {
        req.username.clone()
    } else {
        req.display_name.clone()
    };
    let setup_token = req.setup_token.clone();
    let configured_mode = state.registration_mode.clone();

    let (user_id, is_owner) = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;

        let is_owner = match setup_token.as_deref() {
            Some(token) => {
                if !setup::verify_setup_token(&conn, token)? {
                    return Err(ApiError::BadRequest("invalid setup token".to_string()));
                }
                true
            }
            None => false,
        };

        let mode = settings::get_setting(&conn, "registration_mode")
            .unwrap_or(configured_mode);
        if !is_owner && mode != "open" {
            return Err(ApiError::RegistrationClosed);
        }

        let now = Utc::now().to_rfc3339();
        let inserted = conn.execute(
            "INSERT INTO users (username, display_name, is_owner, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![username, display_name, is_owner, now],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(ApiError::UsernameTaken);
            }
            Err(e) => return Err(e.into()),
        }
        let user_id = conn.last_insert_rowid();

        if is_owner {
            setup::consume_setup_token(&conn)?;
            tracing::info!("Server owner registered: {} (user {})", username, user_id);
        }

        Ok::<_, ApiError>((user_id, is_owner))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    let access_token = jwt::issue_access_token(&state.jwt_secret, user_id, &req.username, is_owner)
        .map_err(|e| ApiError::Internal(format!("token issue: {}", e)))?;

    Ok(Json(RegisterResponse {
        user_id,
        access_token,
        is_owner,
    }))
}
