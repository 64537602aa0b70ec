//! Error types for the notes key vault

use thiserror::Error;

use crate::envelope::EncryptionMode;

#[derive(Debug, Error)]
pub enum KeyVaultError {
    #[error("Secure key storage unavailable: {0}")]
    KeyStoreUnavailable(String),

    #[error("Authentication failed - wrong key, wrong passphrase or tampered data")]
    AuthenticationFailed,

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Envelope is {found} protected, but a {expected} credential was supplied")]
    ModeMismatch {
        expected: EncryptionMode,
        found: EncryptionMode,
    },

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Decrypted content is not valid UTF-8")]
    InvalidUtf8,
}

pub type Result<T> = std::result::Result<T, KeyVaultError>;

impl KeyVaultError {
    /// Errors that point at tampering or a wrong secret rather than a bug.
    pub fn is_security_critical(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::InvalidEnvelope(_))
    }

    /// Errors the caller can recover from by asking the user again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::ModeMismatch { .. })
    }
}

impl From<base64::DecodeError> for KeyVaultError {
    fn from(e: base64::DecodeError) -> Self {
        KeyVaultError::InvalidEnvelope(format!("invalid base64: {}", e))
    }
}
