pub mod registration;

use rusqlite::{Connection, OptionalExtension};

use crate::db::models::User;

fn user_from_row(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        is_owner: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Look up a user by username. Resolution is deterministic: usernames are
/// unique, so this yields at most one user.
pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, username, display_name, is_owner, created_at, updated_at
         FROM users WHERE username = ?1",
        [username],
        user_from_row,
    )
    .optional()
}

/// Look up a user by numeric id.
pub fn find_by_id(conn: &Connection, user_id: i64) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, username, display_name, is_owner, created_at, updated_at
         FROM users WHERE id = ?1",
        [user_id],
        user_from_row,
    )
    .optional()
}
