use std::sync::Arc;
use std::time::Duration;

use wfb_engine::{CredentialFetcher, Orchestrator, PgStore, StepRegistry, WorkflowValidator};

use crate::background::scheduler::SchedulerStatus;
use crate::config::ServerConfig;

/// Timeout applied to every outbound step request.
const STEP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: wfb_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs workflows against the Postgres store.
    pub orchestrator: Arc<Orchestrator>,
    /// Integration ownership checks.
    pub validator: WorkflowValidator,
    /// Schedule trigger liveness, shown on `/health`.
    pub scheduler: Arc<SchedulerStatus>,
}

impl AppState {
    /// Wire the engine on top of `pool`: one store shared by the
    /// orchestrator, credential fetcher and validator, and one HTTP client
    /// shared by every step.
    pub fn new(pool: wfb_db::DbPool, config: ServerConfig) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));

        let http = reqwest::Client::builder()
            .timeout(STEP_REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        let registry = Arc::new(StepRegistry::new(http));

        let fetcher = CredentialFetcher::new(store.clone(), config.encryption_key.clone());
        let orchestrator = Arc::new(Orchestrator::new(store.clone(), registry, fetcher));
        let validator = WorkflowValidator::new(store);

        Self {
            pool,
            config: Arc::new(config),
            orchestrator,
            validator,
            scheduler: Arc::new(SchedulerStatus::default()),
        }
    }
}
