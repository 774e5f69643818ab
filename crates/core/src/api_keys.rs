//! Webhook API key generation and hashing.
//!
//! Keys are opaque `wfb_`-prefixed tokens. Only the SHA-256 digest is
//! persisted; the plaintext is shown to the owner exactly once.

use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Fixed prefix carried by every key.
pub const KEY_PREFIX: &str = "wfb_";

/// Number of random alphanumeric characters after [`KEY_PREFIX`].
pub const KEY_RANDOM_LENGTH: usize = 32;

/// Number of leading characters stored as a human-visible prefix.
pub const KEY_DISPLAY_PREFIX_LENGTH: usize = 11;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// The result of generating a new API key.
pub struct GeneratedApiKey {
    /// The plaintext key (shown to the user exactly once, never stored).
    pub plaintext: String,
    /// The first [`KEY_DISPLAY_PREFIX_LENGTH`] characters of the key.
    pub prefix: String,
    /// The SHA-256 hex digest of the plaintext key.
    pub hash: String,
}

/// Generate a new random API key.
pub fn generate_api_key() -> GeneratedApiKey {
    let random: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_RANDOM_LENGTH)
        .map(char::from)
        .collect();

    let plaintext = format!("{KEY_PREFIX}{random}");
    let prefix = extract_prefix(&plaintext).to_string();
    let hash = hash_api_key(&plaintext);

    GeneratedApiKey {
        plaintext,
        prefix,
        hash,
    }
}

// ---------------------------------------------------------------------------
// Hashing / inspection
// ---------------------------------------------------------------------------

/// Compute the SHA-256 hex digest of an API key.
pub fn hash_api_key(key: &str) -> String {
    crate::hashing::sha256_hex(key.as_bytes())
}

/// Extract the display prefix from a plaintext API key.
pub fn extract_prefix(key: &str) -> &str {
    match key.char_indices().nth(KEY_DISPLAY_PREFIX_LENGTH) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

/// Whether `candidate` has the shape of a key (correct prefix, non-empty body).
pub fn looks_like_api_key(candidate: &str) -> bool {
    candidate
        .strip_prefix(KEY_PREFIX)
        .is_some_and(|rest| !rest.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_prefix_and_length() {
        let key = generate_api_key();
        assert!(key.plaintext.starts_with(KEY_PREFIX));
        assert_eq!(key.plaintext.len(), KEY_PREFIX.len() + KEY_RANDOM_LENGTH);
    }

    #[test]
    fn prefix_is_leading_characters() {
        let key = generate_api_key();
        assert_eq!(key.prefix.len(), KEY_DISPLAY_PREFIX_LENGTH);
        assert!(key.plaintext.starts_with(&key.prefix));
    }

    #[test]
    fn hash_matches_plaintext() {
        let key = generate_api_key();
        assert_eq!(hash_api_key(&key.plaintext), key.hash);
        assert_eq!(key.hash.len(), 64);
    }

    #[test]
    fn two_keys_differ() {
        assert_ne!(generate_api_key().plaintext, generate_api_key().plaintext);
    }

    #[test]
    fn short_key_prefix_is_whole_key() {
        assert_eq!(extract_prefix("wfb_ab"), "wfb_ab");
    }

    #[test]
    fn shape_check() {
        assert!(looks_like_api_key("wfb_abc123"));
        assert!(!looks_like_api_key("wfb_"));
        assert!(!looks_like_api_key("sk_live_123"));
    }
}
