//! AES-256-GCM sealing of note content

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use super::keys::{generate_nonce, NoteKey};
use crate::envelope::CipherEnvelope;
use crate::error::{KeyVaultError, Result};

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// No associated data. The envelope records the key's origin, including
/// the salt for passphrase-derived keys.
pub fn seal(plaintext: &[u8], key: &NoteKey) -> Result<CipherEnvelope> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| KeyVaultError::Crypto(e.to_string()))?;

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| KeyVaultError::Crypto(format!("AES-GCM encryption failed: {}", e)))?;

    Ok(CipherEnvelope::new(key.origin(), nonce_bytes, sealed))
}

/// Verify and decrypt an envelope.
///
/// Any tag mismatch is [`KeyVaultError::AuthenticationFailed`]; no partial
/// plaintext is ever returned.
pub fn open(envelope: &CipherEnvelope, key: &NoteKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.expose())
        .map_err(|e| KeyVaultError::Crypto(e.to_string()))?;

    let nonce = Nonce::from_slice(envelope.nonce());

    cipher.decrypt(nonce, envelope.sealed()).map_err(|_| {
        tracing::warn!(mode = %envelope.mode(), "envelope failed authentication");
        KeyVaultError::AuthenticationFailed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::derive_from_passphrase;
    use crate::crypto::keys::{KeyOrigin, NONCE_LEN, SALT_LEN, TAG_LEN};

    #[test]
    fn test_seal_open_roundtrip() {
        let key = NoteKey::generate_device();
        let samples: [&[u8]; 4] = [
            b"",
            b"x",
            b"Shopping list\nmilk, eggs",
            "zażółć gęślą jaźń \u{1F512}".as_bytes(),
        ];

        for plaintext in samples {
            let envelope = seal(plaintext, &key).unwrap();
            assert_eq!(envelope.sealed().len(), plaintext.len() + TAG_LEN);
            assert_eq!(open(&envelope, &key).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let key = NoteKey::generate_device();
        let a = seal(b"same text", &key).unwrap();
        let b = seal(b"same text", &key).unwrap();

        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.sealed(), b.sealed());
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = NoteKey::generate_device();
        let key2 = NoteKey::generate_device();

        let envelope = seal(b"Secret data", &key1).unwrap();
        let result = open(&envelope, &key2);

        assert!(matches!(result, Err(KeyVaultError::AuthenticationFailed)));
    }

    #[test]
    fn test_every_byte_flip_fails_authentication() {
        let key = NoteKey::generate_device();
        let envelope = seal(b"tamper with me", &key).unwrap();
        let blob = envelope.blob();

        for i in 0..blob.len() {
            let mut mutated = blob.clone();
            mutated[i] ^= 0x01;

            let mut nonce = [0u8; NONCE_LEN];
            nonce.copy_from_slice(&mutated[..NONCE_LEN]);
            let tampered =
                CipherEnvelope::new(KeyOrigin::DeviceKey, nonce, mutated[NONCE_LEN..].to_vec());

            assert!(
                matches!(open(&tampered, &key), Err(KeyVaultError::AuthenticationFailed)),
                "flip at byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_passphrase_key_records_salt() {
        let salt = [4u8; SALT_LEN];
        let key = derive_from_passphrase("hunter2", &salt);
        let envelope = seal(b"note", &key).unwrap();

        assert_eq!(envelope.salt(), Some(&salt));

        let reparsed = CipherEnvelope::parse(&envelope.encode()).unwrap();
        let again = derive_from_passphrase("hunter2", reparsed.salt().unwrap());
        assert_eq!(open(&reparsed, &again).unwrap(), b"note");
    }
}
