//! Route definitions for integrations.

use axum::routing::get;
use axum::Router;

use crate::handlers::integrations;
use crate::state::AppState;

/// Routes mounted at `/integrations`.
///
/// ```text
/// GET    /        -> list_integrations
/// POST   /        -> create_integration
/// GET    /{id}    -> get_integration
/// PATCH  /{id}    -> update_integration
/// DELETE /{id}    -> delete_integration
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(integrations::list_integrations).post(integrations::create_integration),
        )
        .route(
            "/{id}",
            get(integrations::get_integration)
                .patch(integrations::update_integration)
                .delete(integrations::delete_integration),
        )
}
