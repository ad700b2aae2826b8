use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error taxonomy. Every failure surfaces as a stable machine-readable
/// `error` code plus a human-readable `info` string; some errors carry an
/// extra `data` value (e.g. the offending user id). All are terminal —
/// nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("a valid authentication token is required")]
    MissingToken,

    #[error("you do not have permission to manage user blocks")]
    PermissionDenied,

    #[error("you cannot moderate while blocked, except to remove your own block")]
    ActorBlocked,

    #[error("you do not have permission to apply tags")]
    TagPermissionDenied,

    #[error("tag \"{0}\" is not defined")]
    UndefinedTag(String),

    #[error("no user with id {0}")]
    NoSuchUserId(i64),

    #[error("no matching block to remove")]
    BlockNotFound,

    #[error("this user already has an active block")]
    AlreadyBlocked,

    #[error("the server owner cannot be blocked")]
    CannotBlockOwner,

    #[error("registration is closed on this server")]
    RegistrationClosed,

    #[error("this username is already taken")]
    UsernameTaken,

    #[error("user not found")]
    UserNotFound,

    #[error("role not found")]
    RoleNotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Stable error code, part of the API contract.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingToken => "missing-token",
            ApiError::PermissionDenied => "permission-denied",
            ApiError::ActorBlocked => "actor-blocked",
            ApiError::TagPermissionDenied => "tag-permission-denied",
            ApiError::UndefinedTag(_) => "undefined-tag",
            ApiError::NoSuchUserId(_) => "no-such-user-id",
            ApiError::BlockNotFound => "block-not-found",
            ApiError::AlreadyBlocked => "already-blocked",
            ApiError::CannotBlockOwner => "cannot-block-owner",
            ApiError::RegistrationClosed => "registration-closed",
            ApiError::UsernameTaken => "username-taken",
            ApiError::UserNotFound => "user-not-found",
            ApiError::RoleNotFound => "role-not-found",
            ApiError::BadRequest(_) => "bad-request",
            ApiError::Internal(_) => "internal-error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingToken => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied
            | ApiError::ActorBlocked
            | ApiError::TagPermissionDenied
            | ApiError::CannotBlockOwner
            | ApiError::RegistrationClosed => StatusCode::FORBIDDEN,
            ApiError::UndefinedTag(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoSuchUserId(_)
            | ApiError::BlockNotFound
            | ApiError::UserNotFound
            | ApiError::RoleNotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyBlocked | ApiError::UsernameTaken => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn data(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::NoSuchUserId(id) => Some(json!(id)),
            ApiError::UndefinedTag(name) => Some(json!(name)),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("internal error: {}", detail);
        }

        let mut body = json!({
            "error": self.code(),
            "info": self.to_string(),
        });
        if let Some(data) = self.data() {
            body["data"] = data;
        }

        (self.status(), Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(e: rusqlite::Error) -> Self {
        ApiError::Internal(format!("database error: {}", e))
    }
}

/// Shorthand for the poisoned-mutex case when locking the DB pool.
pub fn db_lock_error() -> ApiError {
    ApiError::Internal("database lock poisoned".to_string())
}
