//! Authoritative mapping from target user to at most one active block.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use crate::db::models::Block;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("target already has an active block")]
    AlreadyBlocked,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

fn block_from_row(row: &rusqlite::Row) -> Result<Block, rusqlite::Error> {
    Ok(Block {
        id: row.get(0)?,
        user_id: row.get(1)?,
        blocked_by: row.get(2)?,
        reason: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Active block on a user, if any.
pub fn find_by_user(conn: &Connection, user_id: i64) -> Result<Option<Block>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, user_id, blocked_by, reason, created_at FROM blocks WHERE user_id = ?1",
        [user_id],
        block_from_row,
    )
    .optional()
}

/// Block by its own id.
pub fn find_by_id(conn: &Connection, block_id: i64) -> Result<Option<Block>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, user_id, blocked_by, reason, created_at FROM blocks WHERE id = ?1",
        [block_id],
        block_from_row,
    )
    .optional()
}

/// Insert a block, returning its id. The unique index on user_id rejects a
/// second block for the same target.
pub fn insert(
    conn: &Connection,
    user_id: i64,
    blocked_by: i64,
    reason: Option<&str>,
) -> Result<i64, StoreError> {
    let now = Utc::now().to_rfc3339();
    let result = conn.execute(
        "INSERT INTO blocks (user_id, blocked_by, reason, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, blocked_by, reason, now],
    );
    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(StoreError::AlreadyBlocked)
        }
        Err(e) => Err(e.into()),
    }
}

/// Atomic check-and-delete: returns true iff this call removed the block.
/// Under the connection mutex, two racing removals of the same block see
/// exactly one `true` and one `false`.
pub fn remove(conn: &Connection, block_id: i64) -> Result<bool, rusqlite::Error> {
    let removed = conn.execute("DELETE FROM blocks WHERE id = ?1", [block_id])?;
    Ok(removed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        crate::db::migrations::migrations().to_latest(&mut conn).unwrap();
        crate::roles::seed::seed_builtin_roles(&conn).unwrap();
        conn
    }

    fn add_user(conn: &Connection, username: &str) -> i64 {
        conn.execute(
            "INSERT INTO users (username, display_name, is_owner, created_at, updated_at)
             VALUES (?1, ?1, 0, datetime('now'), datetime('now'))",
            [username],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_insert_remove_roundtrip() {
        let conn = test_conn();
        let target = add_user(&conn, "target");
        let mod_id = add_user(&conn, "moderator");

        let block_id = insert(&conn, target, mod_id, Some("spam")).unwrap();
        assert!(find_by_user(&conn, target).unwrap().is_some());
        assert_eq!(find_by_id(&conn, block_id).unwrap().unwrap().user_id, target);

        assert!(remove(&conn, block_id).unwrap());
        assert!(find_by_user(&conn, target).unwrap().is_none());
        assert!(find_by_id(&conn, block_id).unwrap().is_none());
    }

    #[test]
    fn test_second_remove_returns_false() {
        let conn = test_conn();
        let target = add_user(&conn, "target");
        let mod_id = add_user(&conn, "moderator");

        let block_id = insert(&conn, target, mod_id, None).unwrap();
        assert!(remove(&conn, block_id).unwrap());
        assert!(!remove(&conn, block_id).unwrap());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let conn = test_conn();
        let target = add_user(&conn, "target");
        let mod_id = add_user(&conn, "moderator");

        insert(&conn, target, mod_id, None).unwrap();
        let err = insert(&conn, target, mod_id, None).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyBlocked));
    }
}
