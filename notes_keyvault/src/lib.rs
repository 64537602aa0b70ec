//! # Notes Keyvault
//!
//! Key provider and authenticated encryption for note content.
//!
//! - Transparent mode: AES-256-GCM under a device-bound key kept in the
//!   platform credential store (or an owner-only key file)
//! - Passphrase mode: AES-256-GCM under a PBKDF2-HMAC-SHA256 key with a
//!   fresh 16-byte salt per encryption, carried in the envelope
//! - Envelopes are self-describing base64 text, see [`envelope`]

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keystore;
pub mod service;

// Re-exports
pub use crypto::{NoteKey, KeyOrigin};
pub use envelope::{CipherEnvelope, EncryptionMode};
pub use error::{KeyVaultError, Result};
pub use keystore::{FileKeyStore, KeyProvider, KeyStore, MemoryKeyStore, OsKeyStore};
pub use service::{Credential, NoteCryptoService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
