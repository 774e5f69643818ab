//! Shared HTTP client for the Matic application API.

use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};

use super::StepError;
use crate::credentials::CredentialBag;

pub const CRED_API_URL: &str = "MATIC_API_URL";
pub const CRED_WORKSPACE_ID: &str = "MATIC_WORKSPACE_ID";
pub const CRED_FORM_ID: &str = "MATIC_FORM_ID";
pub const CRED_API_KEY: &str = "MATIC_API_KEY";

/// Client bound to one integration's Matic credentials.
#[derive(Debug, Clone)]
pub struct MaticClient {
    http: reqwest::Client,
    api_url: String,
    workspace_id: String,
    form_id: String,
    api_key: Option<String>,
}

impl MaticClient {
    /// Build a client, failing when the API URL or workspace is missing.
    pub fn from_credentials(
        http: &reqwest::Client,
        credentials: &CredentialBag,
    ) -> Result<Self, StepError> {
        let api_url = credentials
            .get(CRED_API_URL)
            .ok_or_else(|| StepError::NotConfigured("MATIC_API_URL is not configured.".into()))?;
        let workspace_id = credentials.get(CRED_WORKSPACE_ID).ok_or_else(|| {
            StepError::NotConfigured("MATIC_WORKSPACE_ID is not configured.".into())
        })?;

        Ok(Self {
            http: http.clone(),
            api_url: api_url.trim_end_matches('/').to_string(),
            workspace_id: workspace_id.to_string(),
            form_id: credentials.get(CRED_FORM_ID).unwrap_or_default().to_string(),
            api_key: credentials.get(CRED_API_KEY).map(str::to_string),
        })
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn form_url(&self) -> String {
        format!("{}/api/v1/forms/{}", self.api_url, self.form_id)
    }

    pub fn submission_url(&self, application_id: &str) -> String {
        format!("{}/submissions/{application_id}", self.form_url())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// GET a JSON document. Non-success statuses yield `None`.
    pub async fn get_optional(&self, url: &str) -> Result<Option<Value>, StepError> {
        let response = self.request(Method::GET, url).send().await?;
        if !response.status().is_success() {
            tracing::debug!(url, status = response.status().as_u16(), "Matic lookup missed");
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// GET a JSON document, failing with `not_found` on a non-success status.
    pub async fn get(&self, url: &str, not_found: &str) -> Result<Value, StepError> {
        self.get_optional(url)
            .await?
            .ok_or_else(|| StepError::Failed(not_found.to_string()))
    }

    /// Send a JSON body and return the JSON response (`null` when empty).
    ///
    /// A non-success status fails with the response's `error` field, or
    /// `"<failure>: <status>"` when there is none.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        body: &Value,
        failure: &str,
    ) -> Result<Value, StepError> {
        let response = self.request(method, url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let parsed: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            let message = parsed
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{failure}: {}", status.as_u16()));
            return Err(StepError::Failed(message));
        }
        Ok(parsed)
    }

    /// Applicant email of a submission, from `applicant_email` or `data.email`.
    pub async fn applicant_email(&self, application_id: &str) -> Result<Option<String>, StepError> {
        let Some(submission) = self.get_optional(&self.submission_url(application_id)).await?
        else {
            return Ok(None);
        };
        Ok(applicant_email_of(&submission))
    }

    /// Emails of the reviewers assigned to a submission.
    pub async fn reviewer_emails(&self, application_id: &str) -> Result<Vec<String>, StepError> {
        let url = format!("{}/reviewers", self.submission_url(application_id));
        let reviewers = self.get_optional(&url).await?.unwrap_or(Value::Null);
        Ok(reviewers
            .as_array()
            .map(|list| {
                list.iter()
                    .filter_map(|r| r.get("email").and_then(Value::as_str))
                    .filter(|e| !e.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Public portal URL of the form, if the form has one.
    pub async fn portal_url(&self) -> Result<Option<String>, StepError> {
        let form = self.get_optional(&self.form_url()).await?;
        Ok(form.and_then(|f| {
            ["portal_url", "custom_url"]
                .iter()
                .find_map(|k| f.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
                .map(str::to_string)
        }))
    }

    /// Send an email through the Matic email endpoint, returning the message id.
    pub async fn send_email(&self, message: EmailMessage<'_>) -> Result<String, StepError> {
        let mut body = json!({
            "workspace_id": self.workspace_id,
            "to": message.to,
            "subject": message.subject,
            "body": message.body,
            "html_body": message.body.replace('\n', "<br>"),
            "application_id": message.application_id,
        });
        if let Some(kind) = message.notification_type {
            body["notification_type"] = json!(kind);
        }

        let url = format!("{}/api/v1/email/send", self.api_url);
        let response = self.send(Method::POST, &url, &body, message.failure).await?;
        Ok(message_id_of(&response))
    }
}

/// Outgoing email for [`MaticClient::send_email`].
#[derive(Debug, Clone)]
pub struct EmailMessage<'a> {
    pub to: &'a [String],
    pub subject: &'a str,
    pub body: &'a str,
    pub application_id: &'a str,
    pub notification_type: Option<&'a str>,
    /// Prefix of the error reported for a non-success status.
    pub failure: &'a str,
}

pub(crate) fn applicant_email_of(submission: &Value) -> Option<String> {
    submission
        .get("applicant_email")
        .and_then(Value::as_str)
        .or_else(|| submission.pointer("/data/email").and_then(Value::as_str))
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

pub(crate) fn message_id_of(response: &Value) -> String {
    response
        .get("message_id")
        .or_else(|| response.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn bag(pairs: &[(&str, &str)]) -> CredentialBag {
        pairs.iter().copied().collect()
    }

    #[test]
    fn missing_api_url_is_reported_first() {
        let err = MaticClient::from_credentials(&reqwest::Client::new(), &bag(&[])).unwrap_err();
        assert_matches!(err, StepError::NotConfigured(_));
        assert_eq!(err.to_string(), "MATIC_API_URL is not configured.");
    }

    #[test]
    fn missing_workspace_is_reported() {
        let creds = bag(&[(CRED_API_URL, "https://matic.test")]);
        let err = MaticClient::from_credentials(&reqwest::Client::new(), &creds).unwrap_err();
        assert_eq!(err.to_string(), "MATIC_WORKSPACE_ID is not configured.");
    }

    #[test]
    fn urls_are_built_from_credentials() {
        let creds = bag(&[
            (CRED_API_URL, "https://matic.test/"),
            (CRED_WORKSPACE_ID, "ws"),
            (CRED_FORM_ID, "form-9"),
        ]);
        let client = MaticClient::from_credentials(&reqwest::Client::new(), &creds).unwrap();
        assert_eq!(
            client.submission_url("app-1"),
            "https://matic.test/api/v1/forms/form-9/submissions/app-1"
        );
        assert_eq!(client.workspace_id(), "ws");
    }

    #[test]
    fn applicant_email_falls_back_to_form_data() {
        let direct = json!({ "applicant_email": "a@x.io", "data": { "email": "b@x.io" } });
        let nested = json!({ "data": { "email": "b@x.io" } });
        assert_eq!(applicant_email_of(&direct).as_deref(), Some("a@x.io"));
        assert_eq!(applicant_email_of(&nested).as_deref(), Some("b@x.io"));
        assert_eq!(applicant_email_of(&json!({})), None);
    }

    #[test]
    fn message_id_prefers_message_id_field() {
        assert_eq!(message_id_of(&json!({ "message_id": "m1", "id": "x" })), "m1");
        assert_eq!(message_id_of(&json!({ "id": "x" })), "x");
        assert_eq!(message_id_of(&Value::Null), "");
    }
}
