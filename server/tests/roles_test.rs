//! Integration tests for rights groups: CRUD, assignment, live revocation.

mod common;

use common::*;
use serde_json::json;

#[tokio::test]
async fn test_rights_changes_apply_without_reissuing_tokens() {
    let srv = start_test_server().await;
    let (owner_token, _) = register_owner(&srv.base_url, &srv.setup_token).await;
    let (user_token, user_id) = register_user(&srv.base_url, "scribe").await;

    let client = reqwest::Client::new();

    // Not a moderator yet
    let resp = client
        .get(format!("{}/api/moderation/blocks", srv.base_url))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    promote_to_moderator(&srv.base_url, &owner_token, user_id).await;

    // Same token, rights re-read on the next request
    let resp = client
        .get(format!("{}/api/moderation/blocks", srv.base_url))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_role_crud() {
    let srv = start_test_server().await;
    let (owner_token, _) = register_owner(&srv.base_url, &srv.setup_token).await;

    let client = reqwest::Client::new();

    // Create
    let resp = client
        .post(format!("{}/api/roles", srv.base_url))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "name": "archivist", "permissions": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let role: serde_json::Value = resp.json().await.unwrap();
    let role_id = role["id"].as_str().unwrap().to_string();

    // Update
    let resp = client
        .put(format!("{}/api/roles/{}", srv.base_url, role_id))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "permissions": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(updated["permissions"], 3);

    // Delete
    let resp = client
        .delete(format!("{}/api/roles/{}", srv.base_url, role_id))
        .header("Authorization", format!("Bearer {}", owner_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    // Gone from the listing
    let roles: serde_json::Value = client
        .get(format!("{}/api/roles", srv.base_url))
        .header("Authorization", format!("Bearer {}", owner_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!roles["roles"]
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["id"] == role_id.as_str()));
}

#[tokio::test]
async fn test_role_crud_requires_admin() {
    let srv = start_test_server().await;
    register_owner(&srv.base_url, &srv.setup_token).await;
    let (user_token, _) = register_user(&srv.base_url, "scribe").await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/roles", srv.base_url))
        .header("Authorization", format!("Bearer {}", user_token))
        .json(&json!({ "name": "usurper", "permissions": 8 }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_assign_role_to_unknown_user() {
    let srv = start_test_server().await;
    let (owner_token, _) = register_owner(&srv.base_url, &srv.setup_token).await;
    let role_id = role_id_by_name(&srv.base_url, &owner_token, "moderator").await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/roles/assign", srv.base_url))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "user_id": 9999, "role_id": role_id }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "user-not-found");
}

#[tokio::test]
async fn test_default_role_cannot_be_deleted() {
    let srv = start_test_server().await;
    let (owner_token, _) = register_owner(&srv.base_url, &srv.setup_token).await;
    let role_id = role_id_by_name(&srv.base_url, &owner_token, "user").await;

    let client = reqwest::Client::new();
    let resp = client
        .delete(format!("{}/api/roles/{}", srv.base_url, role_id))
        .header("Authorization", format!("Bearer {}", owner_token))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_remove_role_revokes_access() {
    let srv = start_test_server().await;
    let (owner_token, _) = register_owner(&srv.base_url, &srv.setup_token).await;
    let (user_token, user_id) = register_user(&srv.base_url, "scribe").await;
    promote_to_moderator(&srv.base_url, &owner_token, user_id).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/moderation/blocks", srv.base_url))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let role_id = role_id_by_name(&srv.base_url, &owner_token, "moderator").await;
    let resp = client
        .post(format!("{}/api/roles/remove", srv.base_url))
        .header("Authorization", format!("Bearer {}", owner_token))
        .json(&json!({ "user_id": user_id, "role_id": role_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .get(format!("{}/api/moderation/blocks", srv.base_url))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}
