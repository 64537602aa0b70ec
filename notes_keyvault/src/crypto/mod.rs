//! Crypto module - AES-256-GCM sealing, PBKDF2 passphrase keys

pub mod aead;
pub mod kdf;
pub mod keys;

pub use aead::{open, seal};
pub use kdf::{derive_from_passphrase, PBKDF2_ITERATIONS};
pub use keys::{generate_salt, KeyOrigin, NoteKey, KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};
