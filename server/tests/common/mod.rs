//! Shared helpers for integration tests: spawn a real server on an
//! ephemeral port and drive it over HTTP.
#![allow(dead_code)]

use std::net::SocketAddr;

use serde_json::json;
use tokio::net::TcpListener;

use lorekeep_server::audit::{AuditSink, TagStorage};
use lorekeep_server::db::DbPool;

pub struct TestServer {
    pub base_url: String,
    pub setup_token: String,
    /// Handle to the server's database, for direct assertions on audit rows.
    pub db: DbPool,
}

pub async fn start_test_server() -> TestServer {
    start_test_server_with(TagStorage::Dual).await
}

pub async fn start_test_server_with(tag_storage: TagStorage) -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = lorekeep_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = lorekeep_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");
    let setup_token = lorekeep_server::admin::setup::maybe_generate_setup_token(&db)
        .expect("Failed to generate setup token")
        .expect("Expected setup token");

    let state = lorekeep_server::state::AppState {
        db: db.clone(),
        jwt_secret,
        registration_mode: "open".to_string(),
        audit: AuditSink::new(tag_storage),
    };

    let app = lorekeep_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    TestServer {
        base_url: format!("http://{}", addr),
        setup_token,
        db,
    }
}

/// Register the server owner via the setup token. Returns (access_token, user_id).
pub async fn register_owner(base_url: &str, setup_token: &str) -> (String, i64) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({ "username": "owner", "setup_token": setup_token }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200, "Owner registration failed");
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["is_owner"].as_bool().unwrap());
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["user_id"].as_i64().unwrap(),
    )
}

/// Register a regular account. Returns (access_token, user_id).
pub async fn register_user(base_url: &str, username: &str) -> (String, i64) {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({ "username": username }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200, "Registration failed for {}", username);
    let body: serde_json::Value = resp.json().await.unwrap();
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["user_id"].as_i64().unwrap(),
    )
}

/// Look up a seeded role's id by name.
pub async fn role_id_by_name(base_url: &str, token: &str, name: &str) -> String {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/roles", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["roles"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["name"] == name)
        .unwrap_or_else(|| panic!("role {} not found", name))["id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Add a user to the seeded "moderator" rights group.
pub async fn promote_to_moderator(base_url: &str, owner_token: &str, user_id: i64) {
    let role_id = role_id_by_name(base_url, owner_token, "moderator").await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/roles/assign", base_url))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "user_id": user_id, "role_id": role_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Role assignment failed");
}

/// Place a block on a user by username. Returns the block id.
pub async fn block_user(base_url: &str, token: &str, username: &str) -> i64 {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/moderation/block", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "user": username, "reason": "spam" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Block placement failed for {}", username);
    let body: serde_json::Value = resp.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

/// Number of audit entries recorded for an action.
pub fn audit_entry_count(db: &DbPool, action: &str) -> i64 {
    let conn = db.lock().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM audit_log WHERE action = ?1",
        [action],
        |row| row.get(0),
    )
    .unwrap()
}

/// Tag rows for an action carrying the inline tag name.
pub fn audit_tag_count_by_name(db: &DbPool, action: &str, tag: &str) -> i64 {
    let conn = db.lock().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM audit_log_tags alt
         INNER JOIN audit_log al ON al.id = alt.log_id
         WHERE al.action = ?1 AND alt.tag_name = ?2",
        [action, tag],
        |row| row.get(0),
    )
    .unwrap()
}

/// Tag rows for an action resolved through the normalized tag registry.
pub fn audit_tag_count_by_id(db: &DbPool, action: &str, tag: &str) -> i64 {
    let conn = db.lock().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM audit_log_tags alt
         INNER JOIN audit_log al ON al.id = alt.log_id
         INNER JOIN tag_defs td ON td.id = alt.tag_id
         WHERE al.action = ?1 AND td.name = ?2",
        [action, tag],
        |row| row.get(0),
    )
    .unwrap()
}
