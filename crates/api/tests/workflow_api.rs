//! HTTP-level integration tests for workflow CRUD and manual execution.
//!
//! Uses Axum's tower::ServiceExt to send requests directly to the router
//! without an actual TCP listener.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, create_integration, create_workflow, delete_auth, get, get_auth,
    patch_json_auth, post_json, post_json_auth,
};
use serde_json::{json, Value};
use sqlx::PgPool;

const OWNER: &str = "user_owner";
const OTHER: &str = "user_other";

fn trigger() -> Value {
    json!({
        "id": "trigger-1",
        "type": "trigger",
        "position": { "x": 0, "y": 0 },
        "data": { "label": "Trigger", "type": "trigger", "config": { "triggerType": "Manual" } }
    })
}

fn action_using(integration_id: &str) -> Value {
    json!({
        "id": "send",
        "type": "action",
        "position": { "x": 200, "y": 0 },
        "data": {
            "label": "Send Email",
            "type": "action",
            "config": { "actionType": "resend/send-email", "integrationId": integration_id }
        }
    })
}

fn edge(source: &str, target: &str) -> Value {
    json!({ "id": format!("{source}-{target}"), "source": source, "target": target })
}

async fn execution_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM executions")
        .fetch_one(pool)
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_requires_session(pool: PgPool) {
    let response = get(build_test_app(pool), "/api/v1/workflows").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Missing Authorization header");
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health_reports_database(pool: PgPool) {
    let response = get(build_test_app(pool), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dbHealthy"], true);
    assert_eq!(
        json["scheduler"],
        json!({ "running": false, "lastTickAt": null, "skippedWorkflows": 0 })
    );
}

// ---------------------------------------------------------------------------
// Create / read
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_without_nodes_synthesizes_trigger(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Empty", "workspaceId": "ws-1" })).await;

    let response = get_auth(build_test_app(pool), &format!("/api/v1/workflows/{id}"), OWNER).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["isOwner"], true);
    assert_eq!(json["visibility"], "private");
    assert_eq!(json["triggerType"], "manual");
    let nodes = json["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0]["data"]["type"], "trigger");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_then_fetch_round_trips_graph(pool: PgPool) {
    let integration = create_integration(&pool, OWNER).await;
    let mut action = action_using(&integration);
    action["data"]["description"] = Value::Null;
    let nodes = json!([trigger(), action]);
    let edges = json!([{
        "id": "trigger-1-send",
        "source": "trigger-1",
        "target": "send",
        "sourceHandle": null,
        "targetHandle": null
    }]);
    let id = create_workflow(
        &pool,
        OWNER,
        json!({ "name": "Notify", "workspaceId": "ws-1", "nodes": nodes, "edges": edges }),
    )
    .await;

    let json = body_json(
        get_auth(build_test_app(pool), &format!("/api/v1/workflows/{id}"), OWNER).await,
    )
    .await;
    assert_eq!(json["nodes"], nodes);
    assert_eq!(json["edges"], edges);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_foreign_integration_is_forbidden(pool: PgPool) {
    let theirs = create_integration(&pool, OTHER).await;
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/workflows",
        OWNER,
        json!({
            "name": "Sneaky",
            "workspaceId": "ws-1",
            "nodes": [trigger(), action_using(&theirs)],
            "edges": [edge("trigger-1", "send")]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_INTEGRATIONS");
    assert_eq!(json["details"]["invalidIds"], json!([theirs]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_missing_integration_is_bad_request(pool: PgPool) {
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/workflows",
        OWNER,
        json!({
            "name": "Dangling",
            "workspaceId": "ws-1",
            "nodes": [trigger(), action_using("does-not-exist")],
            "edges": [edge("trigger-1", "send")]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["details"]["invalidIds"], json!(["does-not-exist"]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_rejects_blank_name(pool: PgPool) {
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/workflows",
        OWNER,
        json!({ "name": "", "workspaceId": "ws-1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_rejects_dangling_edge(pool: PgPool) {
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/workflows",
        OWNER,
        json!({
            "name": "Broken",
            "workspaceId": "ws-1",
            "nodes": [trigger()],
            "edges": [edge("trigger-1", "ghost")]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_private_workflow_is_hidden_from_others(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Mine", "workspaceId": "ws-1" })).await;

    let response = get_auth(build_test_app(pool.clone()), &format!("/api/v1/workflows/{id}"), OTHER).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(build_test_app(pool), &format!("/api/v1/workflows/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_public_workflow_is_sanitized_for_others(pool: PgPool) {
    let integration = create_integration(&pool, OWNER).await;
    let id = create_workflow(
        &pool,
        OWNER,
        json!({
            "name": "Shared",
            "workspaceId": "ws-1",
            "visibility": "public",
            "nodes": [trigger(), action_using(&integration)],
            "edges": [edge("trigger-1", "send")]
        }),
    )
    .await;

    let json = body_json(get(build_test_app(pool), &format!("/api/v1/workflows/{id}")).await).await;
    assert_eq!(json["isOwner"], false);
    let config = &json["nodes"][1]["data"]["config"];
    assert!(config.get("integrationId").is_none());
    assert_eq!(config["actionType"], "resend/send-email");
}

// ---------------------------------------------------------------------------
// Update / duplicate / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_by_owner(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Before", "workspaceId": "ws-1" })).await;

    let response = patch_json_auth(
        build_test_app(pool),
        &format!("/api/v1/workflows/{id}"),
        OWNER,
        json!({ "name": "After", "visibility": "workspace" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "After");
    assert_eq!(json["visibility"], "workspace");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_by_non_owner_is_forbidden(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Mine", "workspaceId": "ws-1" })).await;

    let response = patch_json_auth(
        build_test_app(pool),
        &format!("/api/v1/workflows/{id}"),
        OTHER,
        json!({ "name": "Theirs now" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_is_private_copy(pool: PgPool) {
    let id = create_workflow(
        &pool,
        OWNER,
        json!({ "name": "Original", "workspaceId": "ws-1", "visibility": "public" }),
    )
    .await;

    let response = post_json_auth(
        build_test_app(pool),
        &format!("/api/v1/workflows/{id}/duplicate"),
        OWNER,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_ne!(json["id"], id.as_str());
    assert_eq!(json["name"], "Original (Copy)");
    assert_eq!(json["visibility"], "private");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_removes_workflow(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Doomed", "workspaceId": "ws-1" })).await;

    let response = delete_auth(build_test_app(pool.clone()), &format!("/api/v1/workflows/{id}"), OWNER).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(build_test_app(pool), &format!("/api/v1/workflows/{id}"), OWNER).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_execute_trigger_only_workflow(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Noop", "workspaceId": "ws-1" })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{id}/execute"),
        OWNER,
        json!({ "input": {} }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["output"], Value::Null);
    let execution_id = outcome["executionId"].as_str().unwrap().to_string();

    let logs = body_json(
        get_auth(
            build_test_app(pool.clone()),
            &format!("/api/v1/executions/{execution_id}/logs"),
            OWNER,
        )
        .await,
    )
    .await;
    assert_eq!(logs["execution"]["status"], "completed");
    assert_eq!(logs["logs"].as_array().unwrap().len(), 1);
    assert_eq!(logs["logs"][0]["nodeId"], "trigger-1");

    let status = body_json(
        get_auth(
            build_test_app(pool),
            &format!("/api/v1/executions/{execution_id}/status"),
            OWNER,
        )
        .await,
    )
    .await;
    assert_eq!(status["status"], "completed");
    assert_eq!(
        status["nodeStatuses"],
        json!([{ "nodeId": "trigger-1", "status": "success" }])
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_execute_condition_branch(pool: PgPool) {
    let condition = json!({
        "id": "check",
        "type": "condition",
        "data": { "label": "Check", "type": "condition", "config": { "condition": "{{Trigger.score}} > 50" } }
    });
    let id = create_workflow(
        &pool,
        OWNER,
        json!({
            "name": "Branchy",
            "workspaceId": "ws-1",
            "nodes": [trigger(), condition],
            "edges": [edge("trigger-1", "check")]
        }),
    )
    .await;

    let outcome = body_json(
        post_json_auth(
            build_test_app(pool),
            &format!("/api/v1/workflows/{id}/execute"),
            OWNER,
            json!({ "input": { "score": 70 } }),
        )
        .await,
    )
    .await;
    assert_eq!(outcome["status"], "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_execute_by_non_owner_creates_nothing(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Mine", "workspaceId": "ws-1" })).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{id}/execute"),
        OTHER,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(execution_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_execute_requires_session(pool: PgPool) {
    let response = post_json(build_test_app(pool), "/api/v1/workflows/nope/execute", json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_execution_history_list_and_clear(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Busy", "workspaceId": "ws-1" })).await;
    for _ in 0..2 {
        let response = post_json_auth(
            build_test_app(pool.clone()),
            &format!("/api/v1/workflows/{id}/execute"),
            OWNER,
            json!({}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let list = body_json(
        get_auth(build_test_app(pool.clone()), &format!("/api/v1/workflows/{id}/executions"), OWNER).await,
    )
    .await;
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(list[0]["triggerType"], "manual");

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/workflows/{id}/executions"),
        OWNER,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({ "success": true, "deletedCount": 2 }));
    assert_eq!(execution_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_execution_logs_are_owner_only(pool: PgPool) {
    let id = create_workflow(&pool, OWNER, json!({ "name": "Mine", "workspaceId": "ws-1" })).await;
    let outcome = body_json(
        post_json_auth(
            build_test_app(pool.clone()),
            &format!("/api/v1/workflows/{id}/execute"),
            OWNER,
            json!({}),
        )
        .await,
    )
    .await;
    let execution_id = outcome["executionId"].as_str().unwrap();

    let response = get_auth(
        build_test_app(pool),
        &format!("/api/v1/executions/{execution_id}/logs"),
        OTHER,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
