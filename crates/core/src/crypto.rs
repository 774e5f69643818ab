//! AES-256-GCM encryption for integration secrets.
//!
//! Ciphertexts are stored as `iv:tag:ciphertext`, each part lowercase hex,
//! with a 16-byte IV and a 16-byte authentication tag.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce};

/// AES-256-GCM with a 128-bit nonce.
type Cipher = AesGcm<Aes256, U16>;

/// Key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// IV length in bytes.
pub const IV_LENGTH: usize = 16;

/// Authentication tag length in bytes.
pub const TAG_LENGTH: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption key must be a {expected}-character hex string")]
    InvalidKey { expected: usize },

    #[error("Invalid encrypted data format")]
    InvalidFormat,

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Encryption failed")]
    EncryptionFailed,
}

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// A 256-bit symmetric key. `Debug` never prints the key material.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LENGTH]);

impl EncryptionKey {
    /// Parse a key from 64 hex characters.
    pub fn from_hex(value: &str) -> Result<Self, CryptoError> {
        let invalid = CryptoError::InvalidKey {
            expected: KEY_LENGTH * 2,
        };
        if value.len() != KEY_LENGTH * 2 {
            return Err(invalid);
        }
        let bytes = hex::decode(value).ok_or(invalid)?;
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    /// The all-zero development key used when no key is configured.
    pub fn insecure_default() -> Self {
        Self([0u8; KEY_LENGTH])
    }

    fn cipher(&self) -> Cipher {
        Cipher::new(Key::<Cipher>::from_slice(&self.0))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

// ---------------------------------------------------------------------------
// Encrypt / decrypt
// ---------------------------------------------------------------------------

/// Encrypt `plaintext`, returning `iv:tag:ciphertext` hex.
pub fn encrypt(plaintext: &str, key: &EncryptionKey) -> Result<String, CryptoError> {
    let nonce = Cipher::generate_nonce(&mut OsRng);
    let sealed = key
        .cipher()
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    // aes-gcm appends the tag to the ciphertext.
    let (body, tag) = sealed.split_at(sealed.len() - TAG_LENGTH);
    Ok(format!(
        "{}:{}:{}",
        hex::encode(nonce),
        hex::encode(tag),
        hex::encode(body)
    ))
}

/// Decrypt an `iv:tag:ciphertext` hex string produced by [`encrypt`].
pub fn decrypt(ciphertext: &str, key: &EncryptionKey) -> Result<String, CryptoError> {
    let mut parts = ciphertext.split(':');
    let (Some(iv), Some(tag), Some(body), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CryptoError::InvalidFormat);
    };

    let iv = hex::decode(iv).ok_or(CryptoError::InvalidFormat)?;
    let tag = hex::decode(tag).ok_or(CryptoError::InvalidFormat)?;
    let mut sealed = hex::decode(body).ok_or(CryptoError::InvalidFormat)?;
    if iv.len() != IV_LENGTH || tag.len() != TAG_LENGTH {
        return Err(CryptoError::InvalidFormat);
    }
    sealed.extend_from_slice(&tag);

    let plain = key
        .cipher()
        .decrypt(Nonce::<U16>::from_slice(&iv), sealed.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    String::from_utf8(plain).map_err(|_| CryptoError::DecryptionFailed)
}

// ---------------------------------------------------------------------------
// hex encoding helper (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(value: &str) -> Option<Vec<u8>> {
        if value.len() % 2 != 0 {
            return None;
        }
        (0..value.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(value.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> EncryptionKey {
        EncryptionKey::from_hex(&"ab".repeat(KEY_LENGTH)).unwrap()
    }

    #[test]
    fn decrypts_what_it_encrypts() {
        let key = test_key();
        let sealed = encrypt(r#"{"apiKey":"re_123"}"#, &key).unwrap();
        assert_eq!(sealed.split(':').count(), 3);
        assert_eq!(decrypt(&sealed, &key).unwrap(), r#"{"apiKey":"re_123"}"#);
    }

    #[test]
    fn iv_is_random_per_call() {
        let key = test_key();
        assert_ne!(encrypt("x", &key).unwrap(), encrypt("x", &key).unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = encrypt("secret", &test_key()).unwrap();
        assert_eq!(
            decrypt(&sealed, &EncryptionKey::insecure_default()),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn tampered_tag_fails() {
        let key = test_key();
        let sealed = encrypt("secret", &key).unwrap();
        let mut parts: Vec<String> = sealed.split(':').map(str::to_string).collect();
        parts[1] = "00".repeat(TAG_LENGTH);
        assert_eq!(
            decrypt(&parts.join(":"), &key),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn malformed_input_is_format_error() {
        let key = test_key();
        assert_eq!(decrypt("abc", &key), Err(CryptoError::InvalidFormat));
        assert_eq!(decrypt("zz:zz:zz", &key), Err(CryptoError::InvalidFormat));
        assert_eq!(decrypt("a:b:c:d", &key), Err(CryptoError::InvalidFormat));
    }

    #[test]
    fn key_must_be_64_hex_chars() {
        assert!(EncryptionKey::from_hex("abcd").is_err());
        assert!(EncryptionKey::from_hex(&"zz".repeat(KEY_LENGTH)).is_err());
        assert!(EncryptionKey::from_hex(&"0f".repeat(KEY_LENGTH)).is_ok());
    }

    #[test]
    fn debug_hides_key() {
        assert_eq!(format!("{:?}", test_key()), "EncryptionKey(..)");
    }
}
