//! Step registry: a dispatch table from every known action type to its step.
//!
//! Action types are a closed enum; the table is filled once at start-up by an
//! exhaustive match so adding an action without a handler does not compile.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use wfb_core::integrations::IntegrationType;

use crate::steps::{matic_email, matic_review, resend, Step};

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    MaticEmailSendEmail,
    MaticEmailSendNotification,
    MaticEmailSendToReviewers,
    MaticReviewMoveToStage,
    MaticReviewAssignReviewers,
    MaticReviewAddTags,
    MaticReviewRemoveTags,
    MaticReviewSetStatus,
    MaticReviewGetApplication,
    MaticReviewCheckScore,
    ResendSendEmail,
}

impl ActionType {
    pub const ALL: [ActionType; 11] = [
        ActionType::MaticEmailSendEmail,
        ActionType::MaticEmailSendNotification,
        ActionType::MaticEmailSendToReviewers,
        ActionType::MaticReviewMoveToStage,
        ActionType::MaticReviewAssignReviewers,
        ActionType::MaticReviewAddTags,
        ActionType::MaticReviewRemoveTags,
        ActionType::MaticReviewSetStatus,
        ActionType::MaticReviewGetApplication,
        ActionType::MaticReviewCheckScore,
        ActionType::ResendSendEmail,
    ];

    /// Wire identifier, `"<integration>/<slug>"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::MaticEmailSendEmail => "matic-email/send-email",
            ActionType::MaticEmailSendNotification => "matic-email/send-notification",
            ActionType::MaticEmailSendToReviewers => "matic-email/send-to-reviewers",
            ActionType::MaticReviewMoveToStage => "matic-review/move-to-stage",
            ActionType::MaticReviewAssignReviewers => "matic-review/assign-reviewers",
            ActionType::MaticReviewAddTags => "matic-review/add-tags",
            ActionType::MaticReviewRemoveTags => "matic-review/remove-tags",
            ActionType::MaticReviewSetStatus => "matic-review/set-status",
            ActionType::MaticReviewGetApplication => "matic-review/get-application",
            ActionType::MaticReviewCheckScore => "matic-review/check-score",
            ActionType::ResendSendEmail => "resend/send-email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value.trim())
    }

    pub fn integration(self) -> IntegrationType {
        match self {
            ActionType::MaticEmailSendEmail
            | ActionType::MaticEmailSendNotification
            | ActionType::MaticEmailSendToReviewers => IntegrationType::MaticEmail,
            ActionType::ResendSendEmail => IntegrationType::Resend,
            _ => IntegrationType::MaticReview,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionType::MaticEmailSendEmail | ActionType::ResendSendEmail => "Send Email",
            ActionType::MaticEmailSendNotification => "Send Notification",
            ActionType::MaticEmailSendToReviewers => "Email Reviewers",
            ActionType::MaticReviewMoveToStage => "Move to Stage",
            ActionType::MaticReviewAssignReviewers => "Assign Reviewers",
            ActionType::MaticReviewAddTags => "Add Tags",
            ActionType::MaticReviewRemoveTags => "Remove Tags",
            ActionType::MaticReviewSetStatus => "Set Status",
            ActionType::MaticReviewGetApplication => "Get Application Data",
            ActionType::MaticReviewCheckScore => "Check Score",
        }
    }

    /// Entry-point name the builder UI refers to the step by.
    pub fn step_function(self) -> &'static str {
        match self {
            ActionType::MaticEmailSendEmail | ActionType::ResendSendEmail => "sendEmailStep",
            ActionType::MaticEmailSendNotification => "sendNotificationStep",
            ActionType::MaticEmailSendToReviewers => "sendToReviewersStep",
            ActionType::MaticReviewMoveToStage => "moveToStageStep",
            ActionType::MaticReviewAssignReviewers => "assignReviewersStep",
            ActionType::MaticReviewAddTags => "addTagsStep",
            ActionType::MaticReviewRemoveTags => "removeTagsStep",
            ActionType::MaticReviewSetStatus => "setStatusStep",
            ActionType::MaticReviewGetApplication => "getApplicationStep",
            ActionType::MaticReviewCheckScore => "checkScoreStep",
        }
    }

    /// Extra attempts after the first. Sends are never retried; idempotent
    /// mutations once; reads twice.
    pub fn max_retries(self) -> u32 {
        match self {
            ActionType::MaticReviewGetApplication | ActionType::MaticReviewCheckScore => 2,
            ActionType::MaticReviewMoveToStage
            | ActionType::MaticReviewAddTags
            | ActionType::MaticReviewRemoveTags
            | ActionType::MaticReviewSetStatus => 1,
            ActionType::MaticEmailSendEmail
            | ActionType::MaticEmailSendNotification
            | ActionType::MaticEmailSendToReviewers
            | ActionType::MaticReviewAssignReviewers
            | ActionType::ResendSendEmail => 0,
        }
    }

    fn default_handler(self, http: &reqwest::Client) -> Arc<dyn Step> {
        let http = http.clone();
        match self {
            ActionType::MaticEmailSendEmail => Arc::new(matic_email::SendEmail::new(http)),
            ActionType::MaticEmailSendNotification => {
                Arc::new(matic_email::SendNotification::new(http))
            }
            ActionType::MaticEmailSendToReviewers => {
                Arc::new(matic_email::SendToReviewers::new(http))
            }
            ActionType::MaticReviewMoveToStage => Arc::new(matic_review::MoveToStage::new(http)),
            ActionType::MaticReviewAssignReviewers => {
                Arc::new(matic_review::AssignReviewers::new(http))
            }
            ActionType::MaticReviewAddTags => Arc::new(matic_review::AddTags::new(http)),
            ActionType::MaticReviewRemoveTags => Arc::new(matic_review::RemoveTags::new(http)),
            ActionType::MaticReviewSetStatus => Arc::new(matic_review::SetStatus::new(http)),
            ActionType::MaticReviewGetApplication => {
                Arc::new(matic_review::GetApplication::new(http))
            }
            ActionType::MaticReviewCheckScore => Arc::new(matic_review::CheckScore::new(http)),
            ActionType::ResendSendEmail => Arc::new(resend::SendEmail::new(http)),
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StepEntry
// ---------------------------------------------------------------------------

/// A resolved registry entry.
#[derive(Clone)]
pub struct StepEntry {
    pub action: ActionType,
    pub step_function: &'static str,
    pub max_retries: u32,
    pub handler: Arc<dyn Step>,
}

impl PartialEq for StepEntry {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.step_function == other.step_function
            && self.max_retries == other.max_retries
            && Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for StepEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepEntry")
            .field("action", &self.action)
            .field("step_function", &self.step_function)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StepRegistry
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct StepRegistry {
    entries: HashMap<ActionType, StepEntry>,
}

impl StepRegistry {
    /// Registry with the built-in handler for every action, sharing `http`.
    pub fn new(http: reqwest::Client) -> Self {
        let entries = ActionType::ALL
            .into_iter()
            .map(|action| {
                let entry = StepEntry {
                    action,
                    step_function: action.step_function(),
                    max_retries: action.max_retries(),
                    handler: action.default_handler(&http),
                };
                (action, entry)
            })
            .collect();
        Self { entries }
    }

    /// Replace the handler for `action`, keeping its retry policy.
    pub fn register(&mut self, action: ActionType, handler: Arc<dyn Step>) {
        self.entries.insert(
            action,
            StepEntry {
                action,
                step_function: action.step_function(),
                max_retries: action.max_retries(),
                handler,
            },
        );
    }

    /// Entry for a wire action type; `None` for unknown types.
    pub fn resolve(&self, action_type: &str) -> Option<StepEntry> {
        let action = ActionType::parse(action_type)?;
        self.entries.get(&action).cloned()
    }

    pub fn label(&self, action_type: &str) -> Option<&'static str> {
        ActionType::parse(action_type).map(ActionType::label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("actions", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::credentials::CredentialBag;
    use crate::steps::StepError;

    struct Noop;

    #[async_trait]
    impl Step for Noop {
        async fn run(&self, _: Value, _: &CredentialBag) -> Result<Value, StepError> {
            Ok(Value::Null)
        }
    }

    #[test]
    fn every_action_round_trips_and_is_registered() {
        let registry = StepRegistry::new(reqwest::Client::new());
        assert_eq!(registry.len(), ActionType::ALL.len());
        for action in ActionType::ALL {
            assert_eq!(ActionType::parse(action.as_str()), Some(action));
            let entry = registry.resolve(action.as_str()).unwrap();
            assert_eq!(entry.action, action);
            assert_eq!(entry.action.integration().as_str(), action.as_str().split('/').next().unwrap());
        }
    }

    #[test]
    fn resolve_is_idempotent() {
        let registry = StepRegistry::new(reqwest::Client::new());
        let first = registry.resolve("resend/send-email").unwrap();
        let second = registry.resolve("resend/send-email").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.step_function, "sendEmailStep");
    }

    #[test]
    fn unknown_action_resolves_to_none() {
        let registry = StepRegistry::new(reqwest::Client::new());
        assert!(registry.resolve("slack/post-message").is_none());
        assert!(registry.resolve("").is_none());
        assert!(registry.label("slack/post-message").is_none());
    }

    #[test]
    fn retry_policy_matches_side_effects() {
        let retries = |a: &str| registry_entry(a).max_retries;
        assert_eq!(retries("matic-review/get-application"), 2);
        assert_eq!(retries("matic-review/check-score"), 2);
        assert_eq!(retries("matic-review/set-status"), 1);
        assert_eq!(retries("matic-review/assign-reviewers"), 0);
        assert_eq!(retries("matic-email/send-email"), 0);
        assert_eq!(retries("resend/send-email"), 0);
    }

    #[test]
    fn register_overrides_handler_but_keeps_policy() {
        let mut registry = StepRegistry::new(reqwest::Client::new());
        let before = registry.resolve("matic-review/check-score").unwrap();
        registry.register(ActionType::MaticReviewCheckScore, Arc::new(Noop));
        let after = registry.resolve("matic-review/check-score").unwrap();
        assert_ne!(before, after);
        assert_eq!(after.max_retries, 2);
    }

    fn registry_entry(action: &str) -> StepEntry {
        StepRegistry::new(reqwest::Client::new())
            .resolve(action)
            .unwrap()
    }
}
