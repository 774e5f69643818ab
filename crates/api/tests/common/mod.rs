#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use wfb_api::auth::jwt::{Claims, JwtConfig};
use wfb_api::config::ServerConfig;
use wfb_api::router::build_app_router;
use wfb_api::state::AppState;
use wfb_core::crypto::EncryptionKey;

const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        scheduler_interval_secs: 60,
        db_max_connections: 5,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
        },
        encryption_key: EncryptionKey::insecure_default(),
    }
}

/// Build the full application router, with the production middleware stack,
/// on top of the given pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    build_app_router(AppState::new(pool, config.clone()), &config)
}

/// A valid session token for `user_id`.
pub fn token_for(user_id: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 900,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn json_request(method: &str, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// GET without credentials.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request("GET", uri, None)).await
}

pub async fn get_auth(app: Router, uri: &str, user_id: &str) -> Response<Body> {
    send(app, empty_request("GET", uri, Some(&token_for(user_id)))).await
}

pub async fn post_json_auth(app: Router, uri: &str, user_id: &str, body: Value) -> Response<Body> {
    send(app, json_request("POST", uri, Some(&token_for(user_id)), body)).await
}

pub async fn patch_json_auth(app: Router, uri: &str, user_id: &str, body: Value) -> Response<Body> {
    send(app, json_request("PATCH", uri, Some(&token_for(user_id)), body)).await
}

pub async fn delete_auth(app: Router, uri: &str, user_id: &str) -> Response<Body> {
    send(app, empty_request("DELETE", uri, Some(&token_for(user_id)))).await
}

/// POST with a raw bearer credential, e.g. an API key.
pub async fn post_json_bearer(app: Router, uri: &str, bearer: &str, body: Value) -> Response<Body> {
    send(app, json_request("POST", uri, Some(bearer), body)).await
}

/// POST an arbitrary body with a raw bearer credential.
pub async fn post_raw_bearer(app: Router, uri: &str, bearer: &str, body: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {bearer}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, json_request("POST", uri, None, body)).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a workflow through the API and return its id.
pub async fn create_workflow(pool: &PgPool, user_id: &str, body: Value) -> String {
    let response = post_json_auth(build_test_app(pool.clone()), "/api/v1/workflows", user_id, body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// Create an integration through the API and return its id.
pub async fn create_integration(pool: &PgPool, user_id: &str) -> String {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/integrations",
        user_id,
        serde_json::json!({
            "name": "Resend",
            "type": "resend",
            "config": { "fromEmail": "ops@example.com" },
            "credentials": { "apiKey": "re_test" }
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["id"].as_str().unwrap().to_string()
}

/// Create an API key through the API and return the plaintext key.
pub async fn create_api_key(pool: &PgPool, user_id: &str) -> String {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/api-keys",
        user_id,
        serde_json::json!({ "name": "ci" }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["key"].as_str().unwrap().to_string()
}
