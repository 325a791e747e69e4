mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn admin_routes_are_forbidden_for_regular_users() {
    let app = spawn_app().await;
    let (_, token) = app.register("chanakya").await;

    let (status, body) = app
        .request(Method::GET, "/admin/analytics/summary", Some(&token), None)
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn promoted_admin_sees_analytics_and_manages_roles() {
    let app = spawn_app().await;
    let (admin_id, admin_token) = app.register("panini").await;
    let (user_id, user_token) = app.register("patanjali").await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&app.pool)
        .await
        .unwrap();

    app.request(
        Method::POST,
        "/correct/grammar",
        Some(&user_token),
        Some(json!({ "text": "वे आए" })),
    )
    .await;

    let (status, summary) = app
        .request(Method::GET, "/admin/analytics/summary", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_users"], 2);
    assert_eq!(summary["admin_users"], 1);
    assert_eq!(summary["total_corrections"], 1);
    assert_eq!(summary["total_words_processed"], 2);

    let (_, users) = app.request(Method::GET, "/admin/users", Some(&admin_token), None).await;
    assert_eq!(users["users"].as_array().unwrap().len(), 2);

    let path = format!("/admin/users/{user_id}/role");
    let (status, _) = app
        .request(Method::PATCH, &path, Some(&admin_token), Some(json!({ "role": "owner" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .request(Method::PATCH, &path, Some(&admin_token), Some(json!({ "role": "admin" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "admin");

    // 새 역할은 다음 요청부터 바로 적용
    let (status, _) = app
        .request(Method::GET, "/admin/users", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reports_export_as_csv_and_json() {
    let app = spawn_app().await;
    let (admin_id, token) = app.register("varahamihira").await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(&admin_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let request = Request::builder()
        .uri("/admin/reports/users?format=csv")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(bytes).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("varahamihira"));

    let (status, body) = app
        .request(Method::GET, "/admin/reports/corrections", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = app
        .request(Method::GET, "/admin/reports/unknown", Some(&token), None)
        .await;
    assert!(status.is_client_error());
}
