//! Symmetric note keys

use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::envelope::EncryptionMode;

/// Key length for AES-256
pub const KEY_LEN: usize = 32;

/// Nonce length for AES-GCM (96 bits)
pub const NONCE_LEN: usize = 12;

/// GCM authentication tag length (128 bits)
pub const TAG_LEN: usize = 16;

/// Passphrase salt length
pub const SALT_LEN: usize = 16;

/// Where a key came from. Sealing copies this into the envelope, so a
/// passphrase envelope always carries the salt its key was derived with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    DeviceKey,
    Passphrase { salt: [u8; SALT_LEN] },
}

impl KeyOrigin {
    pub fn mode(&self) -> EncryptionMode {
        match self {
            Self::DeviceKey => EncryptionMode::DeviceKey,
            Self::Passphrase { .. } => EncryptionMode::Passphrase,
        }
    }
}

/// 256-bit AES key, zeroized on drop
#[derive(Clone)]
pub struct NoteKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
    origin: KeyOrigin,
}

impl NoteKey {
    pub(crate) fn new(bytes: [u8; KEY_LEN], origin: KeyOrigin) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
            origin,
        }
    }

    /// Generate a fresh random device key
    pub(crate) fn generate_device() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self::new(bytes, KeyOrigin::DeviceKey)
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }
}

impl fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteKey")
            .field("origin", &self.origin.mode())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random nonce for AES-GCM
pub fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Generate a fresh passphrase salt. Never derived from note content.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
