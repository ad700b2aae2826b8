/// Database row types shared across modules.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// User record in the users table
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub is_owner: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Active block on a user. Rows are never updated in place — removal
/// is the only terminal transition.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: i64,
    pub user_id: i64,
    pub blocked_by: i64,
    pub reason: Option<String>,
    pub created_at: String,
}
