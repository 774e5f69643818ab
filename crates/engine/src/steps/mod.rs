//! Step implementations for every registered action.
//!
//! A step receives the node's resolved config as `input` and the credential
//! bag fetched for it. Steps never load credentials themselves and never
//! touch the execution store; the orchestrator does both.

use async_trait::async_trait;
use serde_json::Value;

use crate::credentials::CredentialBag;

pub mod matic;
pub mod matic_email;
pub mod matic_review;
pub mod resend;

/// Errors a step reports. The message ends up in the node's log row and,
/// when the step is fatal, in the execution's `error`.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A required credential is absent from the bag.
    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The remote service answered with a failure.
    #[error("{0}")]
    Failed(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Executable unit bound to an action node.
#[async_trait]
pub trait Step: Send + Sync {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError>;
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

/// A non-empty scalar field of `input` rendered as text.
pub(crate) fn input_str(input: &Value, key: &str) -> Option<String> {
    let text = match input.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

pub(crate) fn required_str(input: &Value, key: &str) -> Result<String, StepError> {
    input_str(input, key).ok_or_else(|| StepError::InvalidInput(format!("{key} is required")))
}

/// A numeric field given either as a number or a numeric string.
pub(crate) fn input_f64(input: &Value, key: &str) -> Option<f64> {
    match input.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `"true"` / `true` flags as the builder's select fields store them.
pub(crate) fn input_flag(input: &Value, key: &str) -> bool {
    input_str(input, key).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Split a comma-separated field, dropping blanks.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
