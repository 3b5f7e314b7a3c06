mod common;

use axum::http::StatusCode;
use common::*;
use zentro::db::UserRole;

#[tokio::test]
async fn test_admin_list_requires_login() {
    let (app, _db) = create_test_app().await;
    let response = send(&app, get_request("/api/admin/users", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_list_forbidden_for_user() {
    let (app, _db) = create_test_app().await;
    let response = register(&app, "Alice", "alice@example.com").await;
    let cookie = session_cookie(&response).unwrap();

    let response = send(&app, get_request("/api/admin/users", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_lists_users() {
    let (app, db) = create_test_app().await;
    register(&app, "Bob", "bob@example.com").await;
    let response = register(&app, "Alice", "alice@example.com").await;
    let cookie = session_cookie(&response).unwrap();

    let alice = db.users().get_by_email("alice@example.com").await.unwrap().unwrap();
    db.users().set_role(alice.id, UserRole::Admin).await.unwrap();

    let response = send(&app, get_request("/api/admin/users", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let users = json.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u["email"] == "bob@example.com"));
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn test_demoted_admin_loses_access() {
    let (app, db) = create_test_app().await;
    register(&app, "Alice", "alice@example.com").await;
    let alice = db.users().get_by_email("alice@example.com").await.unwrap().unwrap();
    db.users().set_role(alice.id, UserRole::Admin).await.unwrap();

    let response = login(&app, "alice@example.com", PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();

    let response = send(&app, get_request("/api/admin/users", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Role comes from the database, not the token.
    db.users().set_role(alice.id, UserRole::User).await.unwrap();
    let response = send(&app, get_request("/api/admin/users", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
