//! Route definitions for workflows.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{executions, workflows};
use crate::state::AppState;

/// Routes mounted at `/workflows`.
///
/// ```text
/// GET    /                    -> list_workflows
/// POST   /                    -> create_workflow
/// GET    /{id}                -> get_workflow
/// PATCH  /{id}                -> update_workflow
/// DELETE /{id}                -> delete_workflow
/// POST   /{id}/duplicate      -> duplicate_workflow
/// POST   /{id}/execute        -> execute_workflow
/// GET    /{id}/executions     -> list_executions
/// DELETE /{id}/executions     -> delete_executions
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(workflows::list_workflows).post(workflows::create_workflow),
        )
        .route(
            "/{id}",
            get(workflows::get_workflow)
                .patch(workflows::update_workflow)
                .delete(workflows::delete_workflow),
        )
        .route("/{id}/duplicate", post(workflows::duplicate_workflow))
        .route("/{id}/execute", post(workflows::execute_workflow))
        .route(
            "/{id}/executions",
            get(executions::list_executions).delete(executions::delete_executions),
        )
}
