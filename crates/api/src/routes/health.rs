use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use wfb_core::types::Timestamp;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    pub scheduler: SchedulerHealth,
}

/// Schedule trigger state as seen by this process.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerHealth {
    pub running: bool,
    pub last_tick_at: Option<Timestamp>,
    /// Scheduled workflows left alone until their graph is fixed.
    pub skipped_workflows: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = wfb_db::health_check(&state.pool).await.is_ok();

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        scheduler: SchedulerHealth {
            running: state.scheduler.is_running(),
            last_tick_at: state.scheduler.last_tick_at(),
            skipped_workflows: state.scheduler.skipped_workflows(),
        },
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
