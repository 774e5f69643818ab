use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Webhook trigger route, mounted directly under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/workflows/{id}/webhook", post(webhook::trigger_webhook))
}
