//! `matic-email/*` steps: applicant, reviewer and templated notification email.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use super::matic::{EmailMessage, MaticClient};
use super::{input_flag, input_str, required_str, split_list, Step, StepError};
use crate::credentials::CredentialBag;

/// Canned subject and body for each notification type.
pub fn notification_template(kind: &str) -> Option<(&'static str, &'static str)> {
    let template = match kind {
        "submission_received" => (
            "Application Received",
            "Thank you for submitting your application. We have received it and will begin \
             reviewing it shortly.\n\nYou will receive updates as your application progresses \
             through our review process.",
        ),
        "under_review" => (
            "Application Under Review",
            "Your application is now being reviewed by our team.\n\nWe will notify you once a \
             decision has been made. This process typically takes 2-4 weeks.",
        ),
        "approved" => (
            "Congratulations! Application Approved",
            "We are pleased to inform you that your application has been approved!\n\nPlease \
             check your application portal for next steps and any additional instructions.",
        ),
        "rejected" => (
            "Application Decision",
            "Thank you for your application. After careful consideration, we regret to inform \
             you that we are unable to move forward with your application at this time.\n\nWe \
             appreciate your interest and encourage you to apply again in the future.",
        ),
        "waitlisted" => (
            "Application Waitlisted",
            "Your application has been placed on our waitlist. While we cannot confirm a spot \
             at this time, we will contact you if an opening becomes available.\n\nThank you \
             for your patience.",
        ),
        "more_info_needed" => (
            "Additional Information Needed",
            "We are reviewing your application but need some additional information to \
             proceed.\n\nPlease log in to your application portal to see what information is \
             needed and submit it at your earliest convenience.",
        ),
        "stage_changed" => (
            "Application Status Update",
            "Your application has moved to a new stage in our review process.\n\nPlease check \
             your application portal for the latest status and any updates.",
        ),
        _ => return None,
    };
    Some(template)
}

// ---------------------------------------------------------------------------
// send-email
// ---------------------------------------------------------------------------

/// Email the applicant, the assigned reviewers or a custom address list.
#[derive(Debug, Clone)]
pub struct SendEmail {
    http: reqwest::Client,
}

impl SendEmail {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Step for SendEmail {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = input_str(&input, "applicationId").unwrap_or_default();
        let recipient_type = input_str(&input, "recipientType").unwrap_or_default();

        let recipients: Vec<String> = match recipient_type.as_str() {
            "applicant" => client
                .applicant_email(&application_id)
                .await?
                .into_iter()
                .collect(),
            "reviewers" => client.reviewer_emails(&application_id).await?,
            "custom" => input_str(&input, "customEmails")
                .map(|list| split_list(&list))
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        if recipients.is_empty() {
            return Err(StepError::Failed("No recipients found for the email".into()));
        }

        let subject = input_str(&input, "subject").unwrap_or_default();
        let mut body = input_str(&input, "body").unwrap_or_default();
        if input_flag(&input, "includeApplicationLink") {
            if let Some(portal) = client.portal_url().await? {
                body.push_str(&format!(
                    "\n\n---\nView your application: {portal}/applications/{application_id}"
                ));
            }
        }

        let message_id = client
            .send_email(EmailMessage {
                to: &recipients,
                subject: &subject,
                body: &body,
                application_id: &application_id,
                notification_type: None,
                failure: "Failed to send email",
            })
            .await?;

        Ok(json!({
            "success": true,
            "messageId": message_id,
            "sentTo": recipients.join(", "),
            "sentAt": Utc::now().to_rfc3339(),
        }))
    }
}

// ---------------------------------------------------------------------------
// send-notification
// ---------------------------------------------------------------------------

/// Send one of the canned status notifications to the applicant.
#[derive(Debug, Clone)]
pub struct SendNotification {
    http: reqwest::Client,
}

impl SendNotification {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Step for SendNotification {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;
        let kind = input_str(&input, "notificationType").unwrap_or_default();

        let submission = client
            .get(&client.submission_url(&application_id), "Could not find application")
            .await?;
        let applicant = super::matic::applicant_email_of(&submission)
            .ok_or_else(|| StepError::Failed("No applicant email found".into()))?;

        let (subject, template_body) = notification_template(&kind)
            .ok_or_else(|| StepError::Failed(format!("Unknown notification type: {kind}")))?;
        let mut body = template_body.to_string();
        if let Some(extra) = input_str(&input, "customMessage") {
            body.push_str("\n\n");
            body.push_str(&extra);
        }

        let message_id = client
            .send_email(EmailMessage {
                to: std::slice::from_ref(&applicant),
                subject,
                body: &body,
                application_id: &application_id,
                notification_type: Some(kind.as_str()),
                failure: "Failed to send notification",
            })
            .await?;

        Ok(json!({
            "success": true,
            "messageId": message_id,
            "notificationType": kind,
        }))
    }
}

// ---------------------------------------------------------------------------
// send-to-reviewers
// ---------------------------------------------------------------------------

/// Email every reviewer assigned to an application.
#[derive(Debug, Clone)]
pub struct SendToReviewers {
    http: reqwest::Client,
}

impl SendToReviewers {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Step for SendToReviewers {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let client = MaticClient::from_credentials(&self.http, credentials)?;
        let application_id = required_str(&input, "applicationId")?;

        let reviewers = client.reviewer_emails(&application_id).await?;
        if reviewers.is_empty() {
            return Err(StepError::Failed(
                "No reviewers assigned to this application".into(),
            ));
        }

        let subject = input_str(&input, "subject").unwrap_or_default();
        let mut body = input_str(&input, "body").unwrap_or_default();
        if input_flag(&input, "includeReviewLink") {
            if let Some(portal) = client.portal_url().await? {
                body.push_str(&format!(
                    "\n\n---\nReview this application: {portal}/review/{application_id}"
                ));
            }
        }

        let message_id = client
            .send_email(EmailMessage {
                to: &reviewers,
                subject: &subject,
                body: &body,
                application_id: &application_id,
                notification_type: None,
                failure: "Failed to send email",
            })
            .await?;

        Ok(json!({
            "success": true,
            "messageId": message_id,
            "sentTo": reviewers.join(", "),
            "reviewerCount": reviewers.len(),
            "sentAt": Utc::now().to_rfc3339(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_notification_type_has_a_template() {
        for kind in [
            "submission_received",
            "under_review",
            "approved",
            "rejected",
            "waitlisted",
            "more_info_needed",
            "stage_changed",
        ] {
            let (subject, body) = notification_template(kind).unwrap();
            assert!(!subject.is_empty());
            assert!(body.contains("\n\n"));
        }
        assert!(notification_template("archived").is_none());
    }

    #[tokio::test]
    async fn send_email_without_credentials_fails_before_any_request() {
        let step = SendEmail::new(reqwest::Client::new());
        let err = step
            .run(json!({ "recipientType": "custom", "customEmails": "a@x.io" }), &CredentialBag::empty())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "MATIC_API_URL is not configured.");
    }

    #[tokio::test]
    async fn custom_recipients_must_not_be_empty() {
        let creds: CredentialBag = [
            ("MATIC_API_URL", "http://127.0.0.1:9"),
            ("MATIC_WORKSPACE_ID", "ws"),
        ]
        .into_iter()
        .collect();
        let err = SendEmail::new(reqwest::Client::new())
            .run(json!({ "recipientType": "custom", "customEmails": " , " }), &creds)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No recipients found for the email");
    }
}
