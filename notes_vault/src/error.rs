//! Notes Vault - Error Types

use notes_keyvault::{EncryptionMode, KeyVaultError};
use thiserror::Error;

/// Result type for vault operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Vault error types
#[derive(Error, Debug)]
pub enum VaultError {
    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Secure key storage unavailable: {0}")]
    KeyStoreUnavailable(String),

    #[error("Authentication failed - wrong passphrase or corrupted note")]
    AuthenticationFailed,

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Note is {found} protected, but a {expected} credential was supplied")]
    ModeMismatch {
        expected: EncryptionMode,
        found: EncryptionMode,
    },

    #[error("Note {0} is already encrypted")]
    AlreadyEncrypted(i64),

    #[error("Note {0} is not encrypted")]
    NotEncrypted(i64),

    #[error("Crypto error: {0}")]
    Crypto(String),

    // ═══════════════════════════════════════════════════════════════
    // ARCHIVE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Invalid archive format: {0}")]
    InvalidArchiveFormat(String),

    #[error("Unsupported archive version {found} (newest supported: {supported})")]
    UnsupportedArchiveVersion { found: u32, supported: u32 },

    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    // ═══════════════════════════════════════════════════════════════
    // FILE / CONFIG ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VaultError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            VaultError::KeyStoreUnavailable(_) => "Cannot secure note: device key storage is unavailable".into(),
            VaultError::AuthenticationFailed => "Wrong passphrase, or the note is corrupted".into(),
            VaultError::InvalidArchiveFormat(_) | VaultError::UnsupportedArchiveVersion { .. } => {
                format!("Restore aborted: {}", self)
            }
            other => other.to_string(),
        }
    }

    /// Check if the caller may simply retry (re-prompt, re-run)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VaultError::AuthenticationFailed | VaultError::ModeMismatch { .. } | VaultError::Io(_)
        )
    }

    /// Check if this is a security-critical error
    pub fn is_security_critical(&self) -> bool {
        matches!(
            self,
            VaultError::AuthenticationFailed | VaultError::InvalidEnvelope(_)
        )
    }
}

impl From<KeyVaultError> for VaultError {
    fn from(e: KeyVaultError) -> Self {
        match e {
            KeyVaultError::KeyStoreUnavailable(msg) => VaultError::KeyStoreUnavailable(msg),
            KeyVaultError::AuthenticationFailed => VaultError::AuthenticationFailed,
            KeyVaultError::InvalidEnvelope(msg) => VaultError::InvalidEnvelope(msg),
            KeyVaultError::ModeMismatch { expected, found } => {
                VaultError::ModeMismatch { expected, found }
            }
            other => VaultError::Crypto(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Serialization(e.to_string())
    }
}
