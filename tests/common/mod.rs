#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, header},
};
use serde_json::Value;
use tower::ServiceExt;
use zentro::auth::TokenIssuer;
use zentro::db::Database;
use zentro::server_config::{AuthSettings, Environment};
use zentro::{ServerConfig, create_app};

pub const TEST_SECRET: &str = "test-jwt-secret-test-jwt-secret!";
pub const PASSWORD: &str = "correct horse battery";

pub async fn test_db() -> Database {
    Database::open(":memory:")
        .await
        .expect("Failed to open test database")
}

pub fn test_config(db: Database, environment: Environment) -> ServerConfig {
    let settings = AuthSettings::new(TEST_SECRET, environment);
    ServerConfig {
        db,
        issuer: TokenIssuer::new(&settings).expect("Invalid test settings"),
        ip_header: None,
    }
}

pub async fn create_test_app() -> (Router, Database) {
    let db = test_db().await;
    let app = create_app(&test_config(db.clone(), Environment::Development));
    (app, db)
}

/// Attach the peer address the rate limiters key on.
pub fn with_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().expect("Invalid peer address");
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    with_peer(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        "127.0.0.1:40000",
    )
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    with_peer(builder.body(Body::empty()).unwrap(), "127.0.0.1:40000")
}

pub fn post_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    with_peer(builder.body(Body::empty()).unwrap(), "127.0.0.1:40000")
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Full `Set-Cookie` header value, if any.
pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// `name=value` part of the `Set-Cookie` header, usable as a `Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie(response).and_then(|c| c.split(';').next().map(str::to_string))
}

pub async fn register(app: &Router, name: &str, email: &str) -> Response<Body> {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({ "name": name, "email": email, "password": PASSWORD }),
        ),
    )
    .await
}

pub async fn login(app: &Router, email: &str, password: &str) -> Response<Body> {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        ),
    )
    .await
}
