use chrono::Utc;
use uuid::Uuid;

use super::permissions::Permissions;

/// Seed the built-in rights groups (idempotent guard on existing rows):
/// - "user": the default group every account belongs to; may apply tags.
/// - "moderator": may manage blocks and the tag registry.
pub fn seed_builtin_roles(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM roles", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();

    let user_role_id = Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO roles (id, name, permissions, is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        rusqlite::params![user_role_id, "user", Permissions::APPLY_TAGS.bits(), now],
    )?;

    let moderator_perms =
        Permissions::BLOCK_USERS | Permissions::APPLY_TAGS | Permissions::MANAGE_TAGS;
    let moderator_role_id = Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO roles (id, name, permissions, is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?4)",
        rusqlite::params![moderator_role_id, "moderator", moderator_perms.bits(), now],
    )?;

    Ok(())
}
