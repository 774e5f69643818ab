//! Route definitions for execution inspection.

use axum::routing::get;
use axum::Router;

use crate::handlers::executions;
use crate::state::AppState;

/// Routes mounted at `/executions`.
///
/// ```text
/// GET /{id}/logs      -> get_execution_logs
/// GET /{id}/status    -> get_execution_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/logs", get(executions::get_execution_logs))
        .route("/{id}/status", get(executions::get_execution_status))
}
