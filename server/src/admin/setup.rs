use rand::Rng;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::db::DbPool;

/// Generate a 32-byte random setup token, hex-encoded (64 chars).
/// On first boot (no users in DB), generate and print the token; the first
/// account registered with it becomes the server owner.
/// Only the SHA-256 hash of the token is stored in server_settings.
pub fn generate_setup_token() -> String {
    let token_bytes: [u8; 32] = rand::rng().random();
    hex::encode(token_bytes)
}

/// Hash a setup token with SHA-256 for storage.
pub fn hash_setup_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check if the server needs initial setup (no users exist).
/// If so, generate a setup token, store its hash, and return the plaintext token.
pub fn maybe_generate_setup_token(db: &DbPool) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let conn = db.lock().map_err(|e| format!("DB lock error: {}", e))?;

    let user_count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if user_count > 0 {
        return Ok(None);
    }

    // A hash may already exist if the server restarted before the first
    // registration; the old plaintext is lost, so always issue a fresh token.
    let token = generate_setup_token();
    let hash = hash_setup_token(&token);
    conn.execute(
        "INSERT OR REPLACE INTO server_settings (key, value) VALUES ('setup_token_hash', ?1)",
        [&hash],
    )?;

    Ok(Some(token))
}

/// Verify a setup token against the stored hash.
pub fn verify_setup_token(conn: &Connection, token: &str) -> Result<bool, rusqlite::Error> {
    let stored_hash: Option<String> = conn
        .query_row(
            "SELECT value FROM server_settings WHERE key = 'setup_token_hash'",
            [],
            |row| row.get(0),
        )
        .ok();

    match stored_hash {
        Some(hash) => Ok(hash == hash_setup_token(token)),
        None => Ok(false),
    }
}

/// Consume the setup token after the owner claims it.
pub fn consume_setup_token(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "DELETE FROM server_settings WHERE key = 'setup_token_hash'",
        [],
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO server_settings (key, value) VALUES ('setup_complete', 'true')",
        [],
    )?;
    Ok(())
}
