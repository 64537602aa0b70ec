//! Cipher envelope and its text encoding
//!
//! Wire format, stored in the note's content column:
//! ```text
//! device key:  base64(nonce(12) || ciphertext || tag(16))
//! passphrase:  base64(salt(16)) ":" base64(nonce(12) || ciphertext || tag(16))
//! ```
//! Standard alphabet with padding. The encoder never wraps lines; the
//! parser skips ASCII whitespace because older writers wrapped at 76
//! columns and appended a trailing newline.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::keys::{KeyOrigin, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::error::{KeyVaultError, Result};

const SALT_DELIMITER: char = ':';

/// How a piece of note content was protected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    /// Transparent protection with the device-bound key
    DeviceKey,
    /// Explicit protection with a user passphrase
    Passphrase,
}

impl EncryptionMode {
    /// Guess the mode from the envelope text (salt present or not).
    ///
    /// Diagnostic only: the note's own metadata is the source of truth.
    pub fn detect(envelope: &str) -> Self {
        if envelope.contains(SALT_DELIMITER) {
            Self::Passphrase
        } else {
            Self::DeviceKey
        }
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceKey => f.write_str("device-key"),
            Self::Passphrase => f.write_str("passphrase"),
        }
    }
}

/// One sealed payload: key origin, nonce and ciphertext with its tag.
///
/// Only produced by [`crate::crypto::seal`] or by parsing wire text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherEnvelope {
    origin: KeyOrigin,
    nonce: [u8; NONCE_LEN],
    /// Ciphertext with the 16-byte GCM tag appended
    sealed: Vec<u8>,
}

impl CipherEnvelope {
    pub(crate) fn new(origin: KeyOrigin, nonce: [u8; NONCE_LEN], sealed: Vec<u8>) -> Self {
        Self {
            origin,
            nonce,
            sealed,
        }
    }

    pub fn mode(&self) -> EncryptionMode {
        self.origin.mode()
    }

    pub fn origin(&self) -> KeyOrigin {
        self.origin
    }

    /// Salt, present only for passphrase envelopes
    pub fn salt(&self) -> Option<&[u8; SALT_LEN]> {
        match &self.origin {
            KeyOrigin::DeviceKey => None,
            KeyOrigin::Passphrase { salt } => Some(salt),
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn sealed(&self) -> &[u8] {
        &self.sealed
    }

    /// nonce || ciphertext || tag
    pub fn blob(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(NONCE_LEN + self.sealed.len());
        result.extend_from_slice(&self.nonce);
        result.extend_from_slice(&self.sealed);
        result
    }

    /// Encode to the wire text
    pub fn encode(&self) -> String {
        let blob = STANDARD.encode(self.blob());
        match &self.origin {
            KeyOrigin::DeviceKey => blob,
            KeyOrigin::Passphrase { salt } => {
                format!("{}{}{}", STANDARD.encode(salt), SALT_DELIMITER, blob)
            }
        }
    }

    /// Parse wire text into an envelope
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.split(SALT_DELIMITER);
        let first = parts.next().unwrap_or_default();

        match (parts.next(), parts.next()) {
            (None, _) => Self::from_blob(KeyOrigin::DeviceKey, &decode_part(first)?),
            (Some(blob), None) => {
                let salt_bytes = decode_part(first)?;
                let salt: [u8; SALT_LEN] = salt_bytes.as_slice().try_into().map_err(|_| {
                    KeyVaultError::InvalidEnvelope(format!(
                        "salt must be {} bytes, got {}",
                        SALT_LEN,
                        salt_bytes.len()
                    ))
                })?;
                Self::from_blob(KeyOrigin::Passphrase { salt }, &decode_part(blob)?)
            }
            (Some(_), Some(_)) => Err(KeyVaultError::InvalidEnvelope(
                "more than one salt delimiter".into(),
            )),
        }
    }

    fn from_blob(origin: KeyOrigin, blob: &[u8]) -> Result<Self> {
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(KeyVaultError::InvalidEnvelope(format!(
                "payload too short: {} bytes",
                blob.len()
            )));
        }

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&blob[..NONCE_LEN]);

        Ok(Self::new(origin, nonce, blob[NONCE_LEN..].to_vec()))
    }
}

impl fmt::Display for CipherEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CipherEnvelope {
    type Err = KeyVaultError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn decode_part(part: &str) -> Result<Vec<u8>> {
    let compact: String = part.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(KeyVaultError::InvalidEnvelope("empty envelope part".into()));
    }
    Ok(STANDARD.decode(compact)?)
}
