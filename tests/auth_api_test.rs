//! End-to-end tests for registration, token issue/refresh and logout.

mod common;

use chrono::{Duration, Utc};
use common::{TestServer, PASSWORD};
use foodapi::auth::tokens::TokenKind;
use serde_json::{json, Value};

// ============================================================================
// REGISTER
// ============================================================================

#[tokio::test]
async fn test_register_returns_user_without_secrets() {
    let server = TestServer::start().await;

    let response = server
        .post(
            "/register/",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "first_name": "Alice",
                "password": PASSWORD,
                "password2": PASSWORD
            }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let user: Value = response.json().await.unwrap();
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["first_name"], "Alice");
    assert_eq!(user["last_name"], "");
    assert_eq!(user["is_active"], true);
    assert!(user.get("password").is_none());
    assert!(user.get("password2").is_none());
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
async fn test_register_rejects_weak_and_mismatched_passwords() {
    let server = TestServer::start().await;

    let response = server
        .post(
            "/register/",
            json!({ "username": "alice", "password": "123", "password2": "123" }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let errors: Value = response.json().await.unwrap();
    let problems = errors["password"].as_array().unwrap();
    assert!(problems
        .iter()
        .any(|p| p.as_str().unwrap().starts_with("This password is too short.")));
    assert!(problems.contains(&json!("This password is entirely numeric.")));

    let response = server
        .post(
            "/register/",
            json!({ "username": "alice", "password": PASSWORD, "password2": "different-words-here" }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let errors: Value = response.json().await.unwrap();
    assert_eq!(errors["password"][0], "Password fields didn't match.");
}

#[tokio::test]
async fn test_register_reports_missing_fields() {
    let server = TestServer::start().await;

    let response = server.post("/register/", json!({})).await;
    assert_eq!(response.status(), 400);
    let errors: Value = response.json().await.unwrap();
    for field in ["username", "password", "password2"] {
        assert_eq!(errors[field][0], "This field is required.", "{field}");
    }
    assert!(errors.get("email").is_none());
}

#[tokio::test]
async fn test_register_rejects_duplicate_username() {
    let server = TestServer::start().await;
    server.login("alice").await;

    let response = server
        .post(
            "/register/",
            json!({ "username": "alice", "password": PASSWORD, "password2": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), 400);
    let errors: Value = response.json().await.unwrap();
    assert_eq!(
        errors["username"][0],
        "A user with that username already exists."
    );
}

// ============================================================================
// TOKENS
// ============================================================================

#[tokio::test]
async fn test_token_requires_valid_credentials() {
    let server = TestServer::start().await;
    server.login("alice").await;

    let response = server
        .post(
            "/token/",
            json!({ "username": "alice", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["detail"],
        "No active account found with the given credentials"
    );

    let response = server
        .post("/token/", json!({ "username": "nobody", "password": PASSWORD }))
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_refresh_issues_a_working_access_token() {
    let server = TestServer::start().await;
    let (_, refresh) = server.login("alice").await;

    let response = server
        .post("/token/refresh/", json!({ "refresh": refresh }))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let access = body["access"].as_str().unwrap();

    assert_eq!(server.get_as(access, "/types/").await.status(), 200);

    // An access token cannot be used to refresh
    let response = server
        .post("/token/refresh/", json!({ "refresh": access }))
        .await;
    assert_eq!(response.status(), 401);
}

// ============================================================================
// LOGOUT
// ============================================================================

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let server = TestServer::start().await;
    let (access, refresh) = server.login("alice").await;

    let response = server
        .post_as(&access, "/logout/", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(response.status(), 205);
    assert!(response.text().await.unwrap().is_empty());

    // The same token cannot be revoked twice
    let response = server
        .post_as(&access, "/logout/", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Token is blacklisted");

    // Nor used to mint new access tokens
    let response = server
        .post("/token/refresh/", json!({ "refresh": refresh }))
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Token is blacklisted");

    // The access token stays valid until it expires
    assert_eq!(server.get_as(&access, "/foods/").await.status(), 200);
}

#[tokio::test]
async fn test_logout_failures_are_bad_requests() {
    let server = TestServer::start().await;
    let (access, _) = server.login("alice").await;

    let response = server.post_as(&access, "/logout/", json!({})).await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "refresh_token is required");

    let response = server
        .post_as(&access, "/logout/", json!({ "refresh_token": "garbage" }))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Token is invalid or expired");

    // An access token is not a refresh token
    let response = server
        .post_as(&access, "/logout/", json!({ "refresh_token": access }))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Token has wrong type");
}

#[tokio::test]
async fn test_logout_rejects_expired_refresh_token() {
    let server = TestServer::start().await;
    let (access, _) = server.login("alice").await;

    let expired = server
        .state
        .tokens
        .issue_at(
            server.user_id("alice"),
            TokenKind::Refresh,
            Utc::now() - Duration::days(2),
        )
        .unwrap();

    let response = server
        .post_as(&access, "/logout/", json!({ "refresh_token": expired }))
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Token is invalid or expired");
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let server = TestServer::start().await;
    let (_, refresh) = server.login("alice").await;

    let response = server
        .post("/logout/", json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(response.status(), 401);
}
