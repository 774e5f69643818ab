pub mod api_keys;
pub mod executions;
pub mod health;
pub mod integrations;
pub mod webhook;
pub mod workflows;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /workflows                                   list, create
/// /workflows/{id}                              get, update, delete
/// /workflows/{id}/duplicate                    duplicate (POST)
/// /workflows/{id}/execute                      manual run (POST)
/// /workflows/{id}/executions                   list, clear history
/// /workflows/{id}/webhook                      webhook run (POST, API key, any origin)
///
/// /executions/{id}/logs                        execution with its node logs
/// /executions/{id}/status                      execution and node statuses
///
/// /integrations                                list, create
/// /integrations/{id}                           get, update, delete
///
/// /api-keys                                    list, create
/// /api-keys/{id}                               revoke
/// ```
///
/// `cors` applies to every session-authenticated route. The webhook route
/// is merged after it with a permissive policy so third-party callers can
/// reach it from any origin.
pub fn api_routes(cors: CorsLayer) -> Router<AppState> {
    Router::new()
        .nest("/workflows", workflows::router())
        .nest("/executions", executions::router())
        .nest("/integrations", integrations::router())
        .nest("/api-keys", api_keys::router())
        .layer(cors)
        .merge(webhook::router().layer(CorsLayer::permissive()))
}
