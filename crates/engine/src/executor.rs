//! Step invocation with immediate retries.
//!
//! [`execute`] never fails: handler errors and panics both become a failed
//! [`StepResult`]. Start and completion are stamped around the whole
//! sequence of attempts.

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use wfb_core::types::Timestamp;

use crate::credentials::CredentialBag;
use crate::registry::StepEntry;

/// Outcome of running one step, including every retry.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    /// Attempts made, at least 1.
    pub attempts: u32,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_ms: i64,
}

/// Run `entry`'s handler, retrying up to `entry.max_retries` more times.
pub async fn execute(entry: &StepEntry, input: Value, credentials: &CredentialBag) -> StepResult {
    let started_at = Utc::now();
    let clock = Instant::now();
    let max_attempts = entry.max_retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        tracing::debug!(action = %entry.action, attempt, max_attempts, "step_started");

        let call = entry.handler.run(input.clone(), credentials);
        let message = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(output)) => {
                let duration_ms = clock.elapsed().as_millis() as i64;
                tracing::info!(action = %entry.action, attempt, duration_ms, "step_completed");
                return StepResult {
                    success: true,
                    output: Some(output),
                    error: None,
                    attempts: attempt,
                    started_at,
                    completed_at: Utc::now(),
                    duration_ms,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("Step panicked: {}", panic_message(panic.as_ref())),
        };

        tracing::warn!(
            action = %entry.action,
            attempt,
            max_attempts,
            error = %message,
            "step_failed"
        );
        last_error = message;
    }

    StepResult {
        success: false,
        output: None,
        error: Some(last_error),
        attempts: max_attempts,
        started_at,
        completed_at: Utc::now(),
        duration_ms: clock.elapsed().as_millis() as i64,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
