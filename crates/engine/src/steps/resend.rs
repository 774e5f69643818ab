//! `resend/send-email` through the Resend HTTP API.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{input_str, required_str, split_list, Step, StepError};
use crate::credentials::CredentialBag;

pub const DEFAULT_BASE_URL: &str = "https://api.resend.com";

pub const CRED_API_KEY: &str = "RESEND_API_KEY";
pub const CRED_FROM_EMAIL: &str = "RESEND_FROM_EMAIL";
pub const CRED_FROM_NAME: &str = "RESEND_FROM_NAME";

#[derive(Debug, Clone)]
pub struct SendEmail {
    http: reqwest::Client,
    base_url: String,
}

impl SendEmail {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Sender address: the node's `emailFrom`, else the integration's
/// `RESEND_FROM_EMAIL`, prefixed with `RESEND_FROM_NAME` when set.
fn sender(input: &Value, credentials: &CredentialBag) -> Result<String, StepError> {
    if let Some(from) = input_str(input, "emailFrom") {
        return Ok(from);
    }
    let email = credentials
        .get(CRED_FROM_EMAIL)
        .ok_or_else(|| StepError::InvalidInput("emailFrom is required".into()))?;
    Ok(match credentials.get(CRED_FROM_NAME) {
        Some(name) => format!("{name} <{email}>"),
        None => email.to_string(),
    })
}

fn request_body(input: &Value, credentials: &CredentialBag) -> Result<Value, StepError> {
    let to = split_list(&required_str(input, "emailTo")?);
    if to.is_empty() {
        return Err(StepError::InvalidInput("emailTo is required".into()));
    }

    let mut body = Map::new();
    body.insert("from".into(), json!(sender(input, credentials)?));
    body.insert("to".into(), json!(to));
    body.insert(
        "subject".into(),
        json!(input_str(input, "emailSubject").unwrap_or_default()),
    );
    body.insert(
        "text".into(),
        json!(input_str(input, "emailBody").unwrap_or_default()),
    );
    for (field, key) in [("cc", "emailCc"), ("bcc", "emailBcc")] {
        if let Some(list) = input_str(input, key) {
            body.insert(field.into(), json!(split_list(&list)));
        }
    }
    if let Some(reply_to) = input_str(input, "emailReplyTo") {
        body.insert("reply_to".into(), json!(reply_to));
    }
    Ok(Value::Object(body))
}

#[async_trait]
impl Step for SendEmail {
    async fn run(&self, input: Value, credentials: &CredentialBag) -> Result<Value, StepError> {
        let api_key = credentials
            .get(CRED_API_KEY)
            .ok_or_else(|| StepError::NotConfigured("RESEND_API_KEY is not configured.".into()))?;
        let body = request_body(&input, credentials)?;

        let response = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to send email: {}", status.as_u16()));
            return Err(StepError::Failed(message));
        }

        Ok(json!({
            "success": true,
            "id": payload.get("id").cloned().unwrap_or(Value::Null),
        }))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> CredentialBag {
        pairs.iter().copied().collect()
    }

    #[test]
    fn sender_prefers_node_input() {
        let bag = creds(&[(CRED_FROM_EMAIL, "ops@x.io"), (CRED_FROM_NAME, "Ops")]);
        assert_eq!(
            sender(&json!({ "emailFrom": "me@x.io" }), &bag).unwrap(),
            "me@x.io"
        );
        assert_eq!(sender(&json!({}), &bag).unwrap(), "Ops <ops@x.io>");
        assert_matches!(
            sender(&json!({}), &CredentialBag::empty()),
            Err(StepError::InvalidInput(_))
        );
    }

    #[test]
    fn request_body_splits_recipient_lists() {
        let bag = creds(&[(CRED_FROM_EMAIL, "ops@x.io")]);
        let body = request_body(
            &json!({
                "emailTo": "a@x.io, b@x.io",
                "emailSubject": "Hi",
                "emailBody": "Body",
                "emailCc": "c@x.io",
            }),
            &bag,
        )
        .unwrap();
        assert_eq!(body["to"], json!(["a@x.io", "b@x.io"]));
        assert_eq!(body["cc"], json!(["c@x.io"]));
        assert!(body.get("bcc").is_none());
        assert_eq!(body["from"], "ops@x.io");
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_request() {
        let err = SendEmail::new(reqwest::Client::new())
            .run(json!({ "emailTo": "a@x.io" }), &CredentialBag::empty())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "RESEND_API_KEY is not configured.");
    }
}
