use bitflags::bitflags;
use rusqlite::Connection;

use crate::db::DbPool;
use crate::error::{db_lock_error, ApiError};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u32 {
        const BLOCK_USERS = 1 << 0;  // 0x01
        const APPLY_TAGS  = 1 << 1;  // 0x02
        const MANAGE_TAGS = 1 << 2;  // 0x04
        const ADMIN       = 1 << 3;  // 0x08
    }
}

impl Permissions {
    /// ADMIN implies all other permissions.
    pub fn effective(self) -> Permissions {
        if self.contains(Permissions::ADMIN) {
            Permissions::all()
        } else {
            self
        }
    }
}

/// Compute effective permissions for a user.
/// Owner always has all permissions.
/// Otherwise, OR together permissions from all assigned roles (including the default role).
pub fn compute_user_permissions(is_owner: bool, role_permissions: &[u32]) -> Permissions {
    if is_owner {
        return Permissions::all();
    }
    let combined = role_permissions.iter().fold(0u32, |acc, p| acc | p);
    Permissions::from_bits_truncate(combined).effective()
}

/// Effective permissions for a user, read from the role tables.
/// Rights are re-read on every call — never cached — so rights-group edits
/// take effect on the next request without reissuing tokens.
pub fn user_permissions(
    conn: &Connection,
    user_id: i64,
    is_owner: bool,
) -> Result<Permissions, rusqlite::Error> {
    if is_owner {
        return Ok(Permissions::all());
    }

    // Permission bits from all assigned roles + the default role (is_default=1)
    let mut stmt = conn.prepare(
        "SELECT r.permissions FROM roles r
         INNER JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = ?1
         UNION ALL
         SELECT r.permissions FROM roles r WHERE r.is_default = 1",
    )?;

    let perms: Vec<u32> = stmt
        .query_map([user_id], |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();

    Ok(compute_user_permissions(false, &perms))
}

/// Check if a user has the required permission.
/// Owner always passes. Returns Err(PermissionDenied) on failure.
pub async fn require_permission(
    db: &DbPool,
    user_id: i64,
    is_owner: bool,
    required: Permissions,
) -> Result<(), ApiError> {
    if is_owner {
        return Ok(());
    }

    let db = db.clone();

    let has_permission = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| db_lock_error())?;
        let effective = user_permissions(&conn, user_id, false)?;
        Ok::<bool, ApiError>(effective.contains(required))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("task join: {}", e)))??;

    if has_permission {
        Ok(())
    } else {
        Err(ApiError::PermissionDenied)
    }
}
