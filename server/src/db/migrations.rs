use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: Accounts

CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    display_name TEXT NOT NULL,
    is_owner INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_users_username ON users(username);

CREATE TABLE server_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
",
        ),
        M::up(
            "-- Migration 2: Rights groups and user blocks

CREATE TABLE roles (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    permissions INTEGER NOT NULL DEFAULT 0,
    is_default INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE user_roles (
    user_id INTEGER NOT NULL,
    role_id TEXT NOT NULL,
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (user_id, role_id),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (role_id) REFERENCES roles(id)
);

CREATE INDEX idx_user_roles_user ON user_roles(user_id);

CREATE TABLE blocks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    blocked_by INTEGER NOT NULL,
    reason TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (blocked_by) REFERENCES users(id)
);

-- At most one active block per target, enforced at insert time
CREATE UNIQUE INDEX idx_blocks_user ON blocks(user_id);
",
        ),
        M::up(
            "-- Migration 3: Tag registry and moderation audit log

CREATE TABLE tag_defs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_tag_defs_name ON tag_defs(name);

CREATE TABLE audit_log (
    id TEXT PRIMARY KEY,
    action TEXT NOT NULL,
    actor_id INTEGER NOT NULL,
    target_id INTEGER NOT NULL,
    reason TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (actor_id) REFERENCES users(id),
    FOREIGN KEY (target_id) REFERENCES users(id)
);

CREATE INDEX idx_audit_log_action ON audit_log(action, created_at);

-- Tag rows carry the tag name, the tag_defs id, or both, depending on
-- the configured tag storage mode
CREATE TABLE audit_log_tags (
    log_id TEXT NOT NULL,
    tag_name TEXT,
    tag_id INTEGER,
    FOREIGN KEY (log_id) REFERENCES audit_log(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tag_defs(id)
);

CREATE INDEX idx_audit_log_tags_log ON audit_log_tags(log_id);
CREATE INDEX idx_audit_log_tags_name ON audit_log_tags(tag_name);
",
        ),
    ])
}
