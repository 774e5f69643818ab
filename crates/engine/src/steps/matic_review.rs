//! `matic-review/*` steps: move, tag, assign, set status and read applications.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};

use super::matic::{applicant_email_of, MaticClient};
use super::{input_f64, input_flag, input_str, required_str, split_list, Step, StepError};
use crate::credentials::CredentialBag;

/// Statuses accepted by `set-status`.
pub const APPLICATION_STATUSES: [&str; 5] =
    ["pending", "in_review", "approved", "rejected", "waitlisted"];

macro_rules! review_step {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            http: reqwest::Client,
        }

        impl $name {
            pub fn new(http: reqwest::Client) -> Self {
                Self { http }
            }
        }
    };
}

review_step!(
    /// Move an application to another review stage.
    MoveToStage
);
review_step!(
    /// Assign reviewers by id or let Matic auto-assign by workload.
    AssignReviewers
);
review_step!(AddTags);
review_step!(RemoveTags);
review_step!(SetStatus);
review_step!(
    /// Read an application with its scores and tags.
    GetApplication
);
review_step!(
    /// Compare an application's average score against a threshold.
    CheckScore
);

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[async_trait]
impl Step for MoveToStage {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;
        let stage_id = required_str(&input, "stageId")?;

        let url = format!("{}/stage", client.submission_url(&application_id));
        let body = json!({
            "workspace_id": client.workspace_id(),
            "stage_id": stage_id,
            "reason": input_str(&input, "reason"),
        });
        client
            .send(Method::POST, &url, &body, "Failed to move application")
            .await?;

        Ok(json!({ "success": true, "applicationId": application_id, "stageId": stage_id }))
    }
}

#[async_trait]
impl Step for AssignReviewers {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;
        let reviewer_ids = input_str(&input, "reviewerIds")
            .map(|ids| split_list(&ids))
            .unwrap_or_default();
        let auto_assign = input_flag(&input, "autoAssign");
        if reviewer_ids.is_empty() && !auto_assign {
            return Err(StepError::InvalidInput(
                "reviewerIds is required unless autoAssign is enabled".into(),
            ));
        }

        let url = format!("{}/reviewers", client.submission_url(&application_id));
        let body = json!({
            "workspace_id": client.workspace_id(),
            "reviewer_type_id": input_str(&input, "reviewerTypeId"),
            "reviewer_ids": reviewer_ids,
            "auto_assign": auto_assign,
        });
        let response = client
            .send(Method::POST, &url, &body, "Failed to assign reviewers")
            .await?;

        let assigned = response
            .get("assigned_count")
            .and_then(Value::as_u64)
            .unwrap_or(reviewer_ids.len() as u64);
        Ok(json!({ "success": true, "assignedCount": assigned }))
    }
}

async fn change_tags(
    http: &reqwest::Client,
    method: Method,
    input: &Value,
    credentials: &CredentialBag,
) -> Result<Value, StepError> {
    let client = MaticClient::from_credentials(http, credentials)?;
    let application_id = required_str(input, "applicationId")?;
    let tags = split_list(&required_str(input, "tags")?);
    if tags.is_empty() {
        return Err(StepError::InvalidInput("tags is required".into()));
    }

    let url = format!("{}/tags", client.submission_url(&application_id));
    let body = json!({ "workspace_id": client.workspace_id(), "tags": tags });
    client
        .send(method, &url, &body, "Failed to update tags")
        .await?;

    Ok(json!({ "success": true, "tags": tags }))
}

#[async_trait]
impl Step for AddTags {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        change_tags(&self.http, Method::POST, &input, credentials).await
    }
}

#[async_trait]
impl Step for RemoveTags {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        change_tags(&self.http, Method::DELETE, &input, credentials).await
    }
}

#[async_trait]
impl Step for SetStatus {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;
        let status = required_str(&input, "status")?;
        if !APPLICATION_STATUSES.contains(&status.as_str()) {
            return Err(StepError::InvalidInput(format!(
                "Unknown application status: {status}"
            )));
        }

        let url = format!("{}/status", client.submission_url(&application_id));
        let body = json!({
            "workspace_id": client.workspace_id(),
            "status": status,
            "comment": input_str(&input, "comment"),
        });
        client
            .send(Method::PATCH, &url, &body, "Failed to set status")
            .await?;

        Ok(json!({ "success": true, "status": status }))
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[async_trait]
impl Step for GetApplication {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;
        let submission = client
            .get(&client.submission_url(&application_id), "Could not find application")
            .await?;
        Ok(application_summary(&application_id, &submission))
    }
}

#[async_trait]
impl Step for CheckScore {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;
        let operator = input_str(&input, "operator").unwrap_or_else(|| ">=".to_string());
        let threshold = input_f64(&input, "threshold")
            .ok_or_else(|| StepError::InvalidInput("threshold must be a number".into()))?;
        let min_reviews = input_f64(&input, "minReviews").unwrap_or(1.0).max(0.0) as usize;

        let submission = client
            .get(&client.submission_url(&application_id), "Could not find application")
            .await?;
        let scores = scores_of(&submission);
        let average = average_score(&submission, &scores);

        let passes =
            scores.len() >= min_reviews && score_passes(average, &operator, threshold)?;
        Ok(json!({
            "passes": passes,
            "averageScore": average,
            "reviewCount": scores.len(),
        }))
    }
}

fn application_summary(application_id: &str, submission: &Value) -> Value {
    let field = |key: &str| submission.get(key).cloned().unwrap_or(Value::Null);
    let scores = scores_of(submission);
    json!({
        "id": submission.get("id").cloned().unwrap_or_else(|| json!(application_id)),
        "data": field("data"),
        "status": field("status"),
        "stageId": field("stage_id"),
        "stageName": field("stage_name"),
        "submittedAt": field("submitted_at"),
        "applicantEmail": applicant_email_of(submission),
        "applicantName": field("applicant_name"),
        "scores": scores,
        "averageScore": average_score(submission, &scores),
        "tags": submission.get("tags").cloned().unwrap_or_else(|| json!([])),
    })
}

/// Review scores, given either as numbers or as `{ "score": n }` objects.
fn scores_of(submission: &Value) -> Vec<f64> {
    submission
        .get("scores")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|s| s.as_f64().or_else(|| s.get("score").and_then(Value::as_f64)))
                .collect()
        })
        .unwrap_or_default()
}

/// The service's `average_score` when present, else the mean of `scores`.
fn average_score(submission: &Value, scores: &[f64]) -> f64 {
    if let Some(avg) = submission.get("average_score").and_then(Value::as_f64) {
        return avg;
    }
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn score_passes(average: f64, operator: &str, threshold: f64) -> Result<bool, StepError> {
    Ok(match operator {
        ">=" => average >= threshold,
        ">" => average > threshold,
        "<=" => average <= threshold,
        "<" => average < threshold,
        "==" => (average - threshold).abs() < f64::EPSILON,
        other => {
            return Err(StepError::InvalidInput(format!(
                "Unknown comparison operator: {other}"
            )))
        }
    })
}
