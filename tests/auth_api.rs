mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use sudhaar::config::WordPolicy;

async fn login(app: &common::TestApp, username: &str) -> serde_json::Value {
    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": username, "password": "correct-horse-battery" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
    let app = common::spawn_app().await;
    app.register("meera").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "meera", "password": "another-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = common::spawn_app().await;
    app.register("kabir").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "kabir", "password": "not-the-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn refresh_rotates_and_access_tokens_cannot_refresh() {
    let app = common::spawn_app().await;
    app.register("tara").await;
    let tokens = login(&app, "tara").await;
    let refresh_token = tokens["refresh_token"].as_str().unwrap().to_string();
    let access_token = tokens["access_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(Method::POST, "/auth/refresh", None, Some(json!({ "refresh_token": access_token })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, rotated) = app
        .request(Method::POST, "/auth/refresh", None, Some(json!({ "refresh_token": refresh_token })))
        .await;
    assert_eq!(status, StatusCode::OK, "{rotated}");
    assert_eq!(rotated["user"]["username"], "tara");

    // 한 번 쓴 refresh token은 폐기됨
    let (status, _) = app
        .request(Method::POST, "/auth/refresh", None, Some(json!({ "refresh_token": refresh_token })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_every_refresh_token() {
    let app = common::spawn_app().await;
    let (_, access_token) = app.register("dev").await;
    let refresh_token = login(&app, "dev").await["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = app.request(Method::POST, "/auth/logout", Some(&access_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::POST, "/auth/refresh", None, Some(json!({ "refresh_token": refresh_token })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.request(Method::GET, "/auth/me", Some(&access_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "user");
    assert!(me.get("password_hash").is_none());
}

#[tokio::test]
async fn failed_signup_grant_leaves_no_account_behind() {
    let app = common::spawn_app_with_policy(WordPolicy {
        free_credit_validity_days: i64::MAX,
        ..WordPolicy::default()
    })
    .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "rohan", "password": "correct-horse-battery" })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
}
