//! Schedule trigger.
//!
//! Ticks on a fixed interval and starts every active `schedule` workflow
//! whose last scheduled run is older than its `scheduleIntervalMinutes`.
//! Each run is started inline and walked on its own task so a slow
//! workflow does not hold up the tick.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wfb_core::graph::ExecutionPlan;
use wfb_core::types::{EntityId, Timestamp};
use wfb_core::workflow::{self, TriggerType};
use wfb_db::models::workflow::Workflow;
use wfb_db::repositories::{ExecutionRepo, WorkflowRepo};

use crate::state::AppState;

/// Liveness of the schedule trigger, reported by `/health`.
#[derive(Debug, Default)]
pub struct SchedulerStatus {
    running: AtomicBool,
    /// Milliseconds since the epoch; `0` until the first tick.
    last_tick_ms: AtomicI64,
    skipped: AtomicUsize,
}

impl SchedulerStatus {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn last_tick_at(&self) -> Option<Timestamp> {
        match self.last_tick_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Scheduled workflows currently skipped because their graph cannot run.
    pub fn skipped_workflows(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }

    fn record_tick(&self, at: Timestamp, skipped: usize) {
        self.last_tick_ms.store(at.timestamp_millis(), Ordering::Relaxed);
        self.skipped.store(skipped, Ordering::Relaxed);
    }
}

/// Scheduled workflows whose saved graph failed planning, keyed by id with
/// the `updated_at` that was rejected. They are left alone until edited.
#[derive(Debug, Default)]
struct RejectedGraphs(HashMap<EntityId, Timestamp>);

impl RejectedGraphs {
    fn is_rejected(&self, wf: &Workflow) -> bool {
        self.0.get(&wf.id) == Some(&wf.updated_at)
    }

    fn reject(&mut self, wf: &Workflow) {
        self.0.insert(wf.id.clone(), wf.updated_at);
    }

    /// Forget workflows that are edited, deleted or no longer scheduled.
    fn retain_current(&mut self, workflows: &[Workflow]) {
        let current: HashMap<&str, Timestamp> = workflows
            .iter()
            .map(|wf| (wf.id.as_str(), wf.updated_at))
            .collect();
        self.0
            .retain(|id, at| current.get(id.as_str()) == Some(&*at));
    }

    fn len(&self) -> usize {
        self.0.len()
    }
}

/// Run the schedule trigger loop until `cancel` is triggered.
pub async fn run(state: AppState, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Schedule trigger started");
    state.scheduler.running.store(true, Ordering::Relaxed);

    let mut ticker = tokio::time::interval(interval);
    let mut rejected = RejectedGraphs::default();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Schedule trigger stopping");
                break;
            }
            _ = ticker.tick() => {
                match tick(&state, &mut rejected).await {
                    Ok(0) => tracing::debug!("Schedule trigger: nothing due"),
                    Ok(started) => tracing::info!(started, "Schedule trigger: runs started"),
                    Err(e) => tracing::error!(error = %e, "Schedule trigger: tick failed"),
                }
                state.scheduler.record_tick(Utc::now(), rejected.len());
            }
        }
    }

    state.scheduler.running.store(false, Ordering::Relaxed);
}

/// Start every due workflow, returning how many runs were started.
async fn tick(state: &AppState, rejected: &mut RejectedGraphs) -> Result<usize, sqlx::Error> {
    let now = Utc::now();
    let workflows = WorkflowRepo::list_active_by_trigger(&state.pool, TriggerType::Schedule).await?;
    rejected.retain_current(&workflows);

    let mut started = 0;
    for wf in &workflows {
        if rejected.is_rejected(wf) {
            continue;
        }
        let Some(minutes) = workflow::schedule_interval_minutes(&wf.nodes.0) else {
            tracing::debug!(workflow_id = %wf.id, "Scheduled workflow has no usable interval");
            continue;
        };
        let last = ExecutionRepo::last_created_at(&state.pool, &wf.id, TriggerType::Schedule).await?;
        if !is_due(last, minutes, now) {
            continue;
        }
        if let Err(e) = ExecutionPlan::new(wf.nodes.0.clone(), &wf.edges.0) {
            tracing::warn!(
                workflow_id = %wf.id,
                error = %e,
                "Scheduled workflow skipped until edited: graph cannot run"
            );
            rejected.reject(wf);
            continue;
        }
        if start(state, wf, now).await {
            started += 1;
        }
    }
    Ok(started)
}

/// Whether a workflow last run at `last` is due again at `now`.
fn is_due(last: Option<Timestamp>, interval_minutes: i64, now: Timestamp) -> bool {
    match last {
        None => true,
        Some(last) => chrono::Duration::try_minutes(interval_minutes)
            .is_some_and(|interval| now - last >= interval),
    }
}

async fn start(state: &AppState, wf: &Workflow, now: Timestamp) -> bool {
    match state.validator.validate(&wf.nodes.0, &wf.user_id).await {
        Ok(result) if result.valid => {}
        Ok(result) => {
            tracing::warn!(
                workflow_id = %wf.id,
                invalid = ?result.invalid_ids,
                "Scheduled workflow skipped: invalid integration references"
            );
            return false;
        }
        Err(e) => {
            tracing::error!(workflow_id = %wf.id, error = %e, "Scheduled workflow validation failed");
            return false;
        }
    }

    let input = json!({ "triggeredAt": now.to_rfc3339() });
    let prepared = match state.orchestrator.begin(wf, TriggerType::Schedule, input).await {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::warn!(workflow_id = %wf.id, error = %e, "Scheduled workflow could not start");
            return false;
        }
    };

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.drive(prepared).await {
            tracing::error!(error = %e, "Scheduled execution failed");
        }
    });
    true
}
