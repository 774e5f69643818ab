//! Per-step credential loading.
//!
//! [`CredentialFetcher::fetch`] turns an integration id into a
//! [`CredentialBag`]: the integration's non-secret config overlaid with its
//! decrypted secrets, keyed by the credential names steps read (for example
//! `apiKey` on a Resend integration becomes `RESEND_API_KEY`). Bags are built
//! on every call and never cached.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use wfb_core::crypto::{self, CryptoError, EncryptionKey};
use wfb_core::integrations::IntegrationType;
use wfb_core::types::EntityId;

use crate::store::{IntegrationStore, StoreError};

// ---------------------------------------------------------------------------
// CredentialBag
// ---------------------------------------------------------------------------

/// Read-only credential map handed to a step. `Debug` shows keys only.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialBag {
    values: HashMap<String, String>,
}

impl CredentialBag {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A non-empty credential value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CredentialBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl std::fmt::Debug for CredentialBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_map()
            .entries(keys.into_iter().map(|k| (k, "<redacted>")))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Integration {0} not found")]
    NotFound(EntityId),

    #[error("Integration {id} has unsupported type '{kind}'")]
    UnsupportedType { id: EntityId, kind: String },

    #[error("Failed to decrypt credentials for integration {id}: {source}")]
    Decryption {
        id: EntityId,
        #[source]
        source: CryptoError,
    },

    #[error("Stored credentials for integration {0} are not a JSON object")]
    MalformedSecrets(EntityId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// CredentialFetcher
// ---------------------------------------------------------------------------

/// Loads and decrypts integration credentials on demand.
#[derive(Clone)]
pub struct CredentialFetcher {
    store: Arc<dyn IntegrationStore>,
    key: EncryptionKey,
}

impl CredentialFetcher {
    pub fn new(store: Arc<dyn IntegrationStore>, key: EncryptionKey) -> Self {
        Self { store, key }
    }

    /// Credentials for `integration_id`. A missing or blank id yields an
    /// empty bag.
    pub async fn fetch(
        &self,
        integration_id: Option<&str>,
    ) -> Result<CredentialBag, CredentialError> {
        let Some(id) = integration_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Ok(CredentialBag::empty());
        };

        let integration = self
            .store
            .find_integration(id)
            .await?
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))?;

        let kind = integration
            .kind()
            .ok_or_else(|| CredentialError::UnsupportedType {
                id: id.to_string(),
                kind: integration.integration_type.clone(),
            })?;

        let plaintext = crypto::decrypt(&integration.credentials_encrypted, &self.key)
            .map_err(|source| CredentialError::Decryption {
                id: id.to_string(),
                source,
            })?;
        let secrets: Map<String, Value> = serde_json::from_str(&plaintext)
            .map_err(|_| CredentialError::MalformedSecrets(id.to_string()))?;

        let mut values = HashMap::new();
        if let Value::Object(config) = &integration.config {
            insert_values(&mut values, kind, config);
        }
        insert_values(&mut values, kind, &secrets);

        tracing::debug!(integration_id = id, count = values.len(), "Credentials loaded");
        Ok(CredentialBag { values })
    }
}

impl std::fmt::Debug for CredentialFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialFetcher").finish_non_exhaustive()
    }
}

fn insert_values(
    target: &mut HashMap<String, String>,
    kind: IntegrationType,
    source: &Map<String, Value>,
) {
    for (key, value) in source {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        target.insert(kind.credential_name(key).to_string(), text);
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;
    use wfb_db::models::integration::CreateIntegration;

    use super::*;
    use crate::store::MemoryStore;

    fn store_with(
        kind: IntegrationType,
        config: Value,
        secrets: Value,
        key: &EncryptionKey,
    ) -> (Arc<MemoryStore>, EntityId) {
        let store = Arc::new(MemoryStore::new());
        let integration = store.insert_integration(CreateIntegration {
            user_id: "user-a".into(),
            workspace_id: None,
            name: "test".into(),
            integration_type: kind,
            config,
            credentials_encrypted: crypto::encrypt(&secrets.to_string(), key).unwrap(),
        });
        (store, integration.id)
    }

    #[tokio::test]
    async fn empty_id_yields_empty_bag() {
        let fetcher = CredentialFetcher::new(
            Arc::new(MemoryStore::new()),
            EncryptionKey::insecure_default(),
        );
        assert!(fetcher.fetch(None).await.unwrap().is_empty());
        assert!(fetcher.fetch(Some("  ")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn secrets_overlay_config_under_credential_names() {
        let key = EncryptionKey::insecure_default();
        let (store, id) = store_with(
            IntegrationType::Resend,
            json!({ "fromEmail": "ops@example.com", "apiKey": "stale" }),
            json!({ "apiKey": "re_secret" }),
            &key,
        );
        let fetcher = CredentialFetcher::new(store, key);

        let bag = fetcher.fetch(Some(&id)).await.unwrap();
        assert_eq!(bag.get("RESEND_API_KEY"), Some("re_secret"));
        assert_eq!(bag.get("RESEND_FROM_EMAIL"), Some("ops@example.com"));
        assert_eq!(bag.get("RESEND_FROM_NAME"), None);
    }

    #[tokio::test]
    async fn debug_output_hides_values() {
        let key = EncryptionKey::insecure_default();
        let (store, id) = store_with(
            IntegrationType::MaticReview,
            json!({ "apiUrl": "https://matic.test" }),
            json!({ "apiKey": "very-secret" }),
            &key,
        );
        let bag = CredentialFetcher::new(store, key)
            .fetch(Some(&id))
            .await
            .unwrap();

        let printed = format!("{bag:?}");
        assert!(printed.contains("MATIC_API_KEY"));
        assert!(!printed.contains("very-secret"));
    }

    #[tokio::test]
    async fn missing_integration_is_an_error() {
        let fetcher = CredentialFetcher::new(
            Arc::new(MemoryStore::new()),
            EncryptionKey::insecure_default(),
        );
        let err = fetcher.fetch(Some("ghost")).await.unwrap_err();
        assert_matches!(err, CredentialError::NotFound(id) if id == "ghost");
    }

    #[tokio::test]
    async fn wrong_key_fails_decryption() {
        let (store, id) = store_with(
            IntegrationType::Resend,
            json!({}),
            json!({ "apiKey": "re_secret" }),
            &EncryptionKey::insecure_default(),
        );
        let other = EncryptionKey::from_hex(&"ab".repeat(32)).unwrap();
        let err = CredentialFetcher::new(store, other)
            .fetch(Some(&id))
            .await
            .unwrap_err();
        assert_matches!(err, CredentialError::Decryption { .. });
    }
}
