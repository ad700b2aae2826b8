//! Integration tests for registration and token handling.

mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn test_health_check() {
    let srv = start_test_server().await;
    let resp = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_register_owner_and_user() {
    let srv = start_test_server().await;
    let (_, owner_id) = register_owner(&srv.base_url, &srv.setup_token).await;
    let (_, user_id) = register_user(&srv.base_url, "scribe").await;

    assert_ne!(owner_id, user_id);

    let info: serde_json::Value = reqwest::get(format!("{}/api/server/info", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["registration_mode"], "open");
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let srv = start_test_server().await;
    register_user(&srv.base_url, "scribe").await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/register", srv.base_url))
        .json(&json!({ "username": "scribe" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "username-taken");
}

#[tokio::test]
async fn test_invalid_username_rejected() {
    let srv = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/register", srv.base_url))
        .json(&json!({ "username": "a b" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad-request");
}

#[tokio::test]
async fn test_garbage_token_rejected() {
    let srv = start_test_server().await;
    register_owner(&srv.base_url, &srv.setup_token).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/moderation/blocks", srv.base_url))
        .header("Authorization", "Bearer not-a-real-token")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "missing-token");
}

#[tokio::test]
async fn test_closed_registration() {
    let srv = start_test_server().await;
    let (owner_token, _) = register_owner(&srv.base_url, &srv.setup_token).await;

    let client = reqwest::Client::new();
    let resp = client
        .put(format!("{}/api/server/settings", srv.base_url))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "registration_mode": "closed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(format!("{}/api/auth/register", srv.base_url))
        .json(&json!({ "username": "latecomer" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "registration-closed");
}

#[tokio::test]
async fn test_invalid_setup_token_rejected() {
    let srv = start_test_server().await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/auth/register", srv.base_url))
        .json(&json!({ "username": "impostor", "setup_token": "deadbeef" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "bad-request");
}
