use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use toolkit_api::{AppState, auth::TokenKeys, build_router};
use toolkit_storage::{MemoryStorage, ToolkitStorage, seed_catalog};
use toolkit_types::AUTH_HEADER;
use tower::ServiceExt;

const FLEXBOX: i64 = 101;

async fn test_app() -> Router {
    let storage = Arc::new(MemoryStorage::new());
    seed_catalog(storage.as_ref()).await.unwrap();
    let storage: Arc<dyn ToolkitStorage> = storage;
    let state = AppState::new(
        storage,
        TokenKeys::new(b"test-secret", chrono::Duration::days(7)),
    );
    build_router(state, Duration::from_secs(60))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(AUTH_HEADER, token);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, username: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn downloads(app: &Router, id: i64) -> i64 {
    let (_, body) = send(app, "GET", &format!("/api/modules/{}", id), None, None).await;
    body["downloads"].as_i64().unwrap()
}

#[tokio::test]
async fn test_banner() {
    let app = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], toolkit_api::BANNER.as_bytes());
}

#[tokio::test]
async fn test_list_is_ordered_by_downloads() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/modules", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let downloads: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["downloads"].as_i64().unwrap())
        .collect();
    assert_eq!(downloads, vec![150, 120, 95, 85]);
}

#[tokio::test]
async fn test_install_requires_token() {
    let app = test_app().await;
    let uri = format!("/api/modules/{}/install", FLEXBOX);

    let (status, body) = send(&app, "POST", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");

    let (status, _) = send(&app, "POST", &uri, Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_install_unknown_module_is_not_found() {
    let app = test_app().await;
    let token = register(&app, "alice").await;

    let (status, body) = send(&app, "POST", "/api/modules/999/install", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "module_not_found");
}

#[tokio::test]
async fn test_install_returns_authoritative_set() {
    let app = test_app().await;
    let token = register(&app, "alice").await;
    let before = downloads(&app, FLEXBOX).await;

    let uri = format!("/api/modules/{}/install", FLEXBOX);
    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["installedModules"], json!([FLEXBOX]));
    assert_eq!(body["user"]["installedModules"], json!([FLEXBOX]));
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(downloads(&app, FLEXBOX).await, before + 1);

    let (status, body) = send(&app, "POST", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "already_installed");
    assert_eq!(downloads(&app, FLEXBOX).await, before + 1);
}

#[tokio::test]
async fn test_round_trip_keeps_counter() {
    let app = test_app().await;
    let token = register(&app, "alice").await;
    let before = downloads(&app, FLEXBOX).await;

    let install = format!("/api/modules/{}/install", FLEXBOX);
    let uninstall = format!("/api/modules/{}/uninstall", FLEXBOX);
    send(&app, "POST", &install, Some(&token), None).await;

    let (status, body) = send(&app, "DELETE", &uninstall, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["installedModules"], json!([]));
    assert_eq!(downloads(&app, FLEXBOX).await, before + 1);

    let (status, body) = send(&app, "DELETE", &uninstall, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "not_installed");
}

#[tokio::test]
async fn test_installs_are_per_user() {
    let app = test_app().await;
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;

    send(
        &app,
        "POST",
        &format!("/api/modules/{}/install", FLEXBOX),
        Some(&alice),
        None,
    )
    .await;

    let (_, body) = send(&app, "GET", "/api/auth/user", Some(&bob), None).await;
    assert_eq!(body["installedModules"], json!([]));

    let (_, body) = send(&app, "GET", "/api/users/modules", Some(&alice), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "CSS Flexbox Snippets");
}

#[tokio::test]
async fn test_register_and_login() {
    let app = test_app().await;
    register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "email": "other@example.com", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("username"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "email": "a@example.com", "password": "123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_password_change() {
    let app = test_app().await;
    let token = register(&app, "alice").await;

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/password",
        Some(&token),
        Some(json!({"currentPassword": "nope", "newPassword": "another123"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "wrong_password");

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/password",
        Some(&token),
        Some(json!({"currentPassword": "secret123", "newPassword": "another123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "another123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_profile_update_checks_other_users() {
    let app = test_app().await;
    let alice = register(&app, "alice").await;
    register(&app, "bob").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/users/profile",
        Some(&alice),
        Some(json!({"username": "bob"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/users/profile",
        Some(&alice),
        Some(json!({"email": "alice@new.example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@new.example.com");
}

#[tokio::test]
async fn test_catalog_maintenance() {
    let app = test_app().await;
    let token = register(&app, "alice").await;

    let new_module = json!({
        "name": "Rust Error Helpers",
        "description": "thiserror patterns",
        "category": "Rust",
        "content": "pub enum Error {}",
        "tags": ["errors"],
    });
    let (status, _) = send(&app, "POST", "/api/modules", None, Some(new_module.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, created) =
        send(&app, "POST", "/api/modules", Some(&token), Some(new_module.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();
    assert!(id > toolkit_types::DEMO_ID_MAX);

    let (status, _) = send(&app, "POST", "/api/modules", Some(&token), Some(new_module)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/api/modules/{}", id),
        Some(&token),
        Some(json!({"description": "Error enums"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "Error enums");
    assert_eq!(updated["name"], "Rust Error Helpers");

    let (_, by_category) = send(&app, "GET", "/api/modules/category/Rust", None, None).await;
    assert_eq!(by_category.as_array().unwrap().len(), 1);

    let (_, by_tag) = send(&app, "GET", "/api/modules/search/errors", None, None).await;
    assert_eq!(by_tag[0]["id"], json!(id));

    let uri = format!("/api/modules/{}", id);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_new_modules_start_with_zero_downloads() {
    let app = test_app().await;
    let token = register(&app, "alice").await;

    let body = json!({
        "name": "Inflated Module",
        "description": "claims to be popular",
        "category": "Utility",
        "content": "noop",
        "downloads": 1_000_000,
    });
    let (status, created) = send(&app, "POST", "/api/modules", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["downloads"], json!(0));

    let id = created["id"].as_i64().unwrap();
    assert_eq!(downloads(&app, id).await, 0);
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/modules/search/GRID", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "CSS Grid Templates");

    let (status, _) = send(&app, "GET", "/api/modules/category/Cobol", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_schema_lists_wire_types() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/api/schema", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("InstallResponse").is_some());
    assert!(body.get("Module").is_some());
}
