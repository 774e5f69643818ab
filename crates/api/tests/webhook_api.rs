//! HTTP-level integration tests for the API-key authenticated webhook trigger.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_api_key, create_workflow, get_auth, post_json,
    post_json_bearer, post_raw_bearer,
};
use serde_json::json;
use sqlx::PgPool;

const OWNER: &str = "user_owner";
const OTHER: &str = "user_other";

async fn webhook_workflow(pool: &PgPool) -> String {
    create_workflow(
        pool,
        OWNER,
        json!({
            "name": "Inbound",
            "workspaceId": "ws-1",
            "nodes": [{
                "id": "trigger-1",
                "type": "trigger",
                "data": { "label": "Trigger", "type": "trigger", "config": { "triggerType": "Webhook" } }
            }]
        }),
    )
    .await
}

async fn execution_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM executions")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_requires_api_key(pool: PgPool) {
    let id = webhook_workflow(&pool).await;
    let response = post_json(build_test_app(pool), &format!("/api/v1/workflows/{id}/webhook"), json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Missing Authorization header");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_rejects_malformed_key(pool: PgPool) {
    let id = webhook_workflow(&pool).await;
    let response = post_json_bearer(
        build_test_app(pool),
        &format!("/api/v1/workflows/{id}/webhook"),
        "not-a-key",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid API key format");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_rejects_unknown_key(pool: PgPool) {
    let id = webhook_workflow(&pool).await;
    let response = post_json_bearer(
        build_test_app(pool),
        &format!("/api/v1/workflows/{id}/webhook"),
        "wfb_00000000000000000000000000000000",
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid API key");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_with_foreign_key_creates_nothing(pool: PgPool) {
    let id = webhook_workflow(&pool).await;
    let key = create_api_key(&pool, OTHER).await;

    let response = post_json_bearer(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{id}/webhook"),
        &key,
        json!({ "hello": "world" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "API key does not have access to this workflow"
    );
    assert_eq!(execution_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_unknown_workflow(pool: PgPool) {
    let key = create_api_key(&pool, OWNER).await;
    let response = post_json_bearer(
        build_test_app(pool),
        "/api/v1/workflows/missing/webhook",
        &key,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_rejects_invalid_json(pool: PgPool) {
    let id = webhook_workflow(&pool).await;
    let key = create_api_key(&pool, OWNER).await;

    let response = post_raw_bearer(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{id}/webhook"),
        &key,
        "{not json",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Request body must be valid JSON");
    assert_eq!(execution_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_webhook_starts_run_in_background(pool: PgPool) {
    let id = webhook_workflow(&pool).await;
    let key = create_api_key(&pool, OWNER).await;

    let response = post_json_bearer(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{id}/webhook"),
        &key,
        json!({ "orderId": 42 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "running");
    let execution_id = json["executionId"].as_str().unwrap().to_string();

    let mut status = String::new();
    for _ in 0..50 {
        let json = body_json(
            get_auth(
                build_test_app(pool.clone()),
                &format!("/api/v1/executions/{execution_id}/status"),
                OWNER,
            )
            .await,
        )
        .await;
        status = json["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(status, "completed");

    let logs = body_json(
        get_auth(
            build_test_app(pool),
            &format!("/api/v1/executions/{execution_id}/logs"),
            OWNER,
        )
        .await,
    )
    .await;
    assert_eq!(logs["execution"]["triggerType"], "webhook");
    assert_eq!(logs["execution"]["input"], json!({ "orderId": 42 }));
}
