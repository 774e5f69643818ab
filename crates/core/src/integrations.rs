//! Integration kinds known to the platform.

use serde::{Deserialize, Serialize};

/// The service an integration holds credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationType {
    MaticEmail,
    MaticReview,
    Resend,
}

impl IntegrationType {
    pub const ALL: [IntegrationType; 3] = [
        IntegrationType::MaticEmail,
        IntegrationType::MaticReview,
        IntegrationType::Resend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationType::MaticEmail => "matic-email",
            IntegrationType::MaticReview => "matic-review",
            IntegrationType::Resend => "resend",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Config keys and the credential names steps read them under.
    pub fn credential_keys(self) -> &'static [(&'static str, &'static str)] {
        match self {
            IntegrationType::MaticEmail | IntegrationType::MaticReview => &[
                ("apiUrl", "MATIC_API_URL"),
                ("workspaceId", "MATIC_WORKSPACE_ID"),
                ("formId", "MATIC_FORM_ID"),
                ("apiKey", "MATIC_API_KEY"),
            ],
            IntegrationType::Resend => &[
                ("apiKey", "RESEND_API_KEY"),
                ("fromEmail", "RESEND_FROM_EMAIL"),
                ("fromName", "RESEND_FROM_NAME"),
            ],
        }
    }

    /// Credential name for a config key; unknown keys keep their own name.
    pub fn credential_name(self, config_key: &str) -> &str {
        self.credential_keys()
            .iter()
            .find(|(key, _)| *key == config_key)
            .map(|(_, name)| *name)
            .unwrap_or(config_key)
    }
}

impl std::fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_matches_as_str() {
        for t in IntegrationType::ALL {
            assert_eq!(IntegrationType::parse(t.as_str()), Some(t));
        }
        assert_eq!(IntegrationType::parse("slack"), None);
    }

    #[test]
    fn config_keys_map_to_credential_names() {
        assert_eq!(
            IntegrationType::MaticReview.credential_name("apiUrl"),
            "MATIC_API_URL"
        );
        assert_eq!(
            IntegrationType::Resend.credential_name("apiKey"),
            "RESEND_API_KEY"
        );
        assert_eq!(IntegrationType::Resend.credential_name("region"), "region");
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&IntegrationType::MaticReview).unwrap();
        assert_eq!(json, "\"matic-review\"");
    }
}
