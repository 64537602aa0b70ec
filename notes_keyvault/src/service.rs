//! Note crypto service - the transparent / passphrase mode switch

use crate::crypto::{self, generate_salt, NoteKey};
use crate::envelope::{CipherEnvelope, EncryptionMode};
use crate::error::{KeyVaultError, Result};
use crate::keystore::KeyProvider;

/// Which secret protects (or should protect) a piece of content
#[derive(Clone, Copy)]
pub enum Credential<'a> {
    DeviceKey,
    Passphrase(&'a str),
}

impl Credential<'_> {
    pub fn mode(&self) -> EncryptionMode {
        match self {
            Self::DeviceKey => EncryptionMode::DeviceKey,
            Self::Passphrase(_) => EncryptionMode::Passphrase,
        }
    }
}

impl std::fmt::Debug for Credential<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceKey => f.write_str("DeviceKey"),
            Self::Passphrase(_) => f.write_str("Passphrase(..)"),
        }
    }
}

/// Public encrypt/decrypt entry point for note text.
///
/// Stateless apart from the provider's cached device key, so one instance
/// can be shared across worker threads.
pub struct NoteCryptoService {
    keys: KeyProvider,
}

impl NoteCryptoService {
    pub fn new(keys: KeyProvider) -> Self {
        Self { keys }
    }

    pub fn key_provider(&self) -> &KeyProvider {
        &self.keys
    }

    pub fn encrypt_transparent(&self, plaintext: &str) -> Result<String> {
        self.encrypt(plaintext, Credential::DeviceKey)
    }

    pub fn encrypt_with_passphrase(&self, plaintext: &str, passphrase: &str) -> Result<String> {
        self.encrypt(plaintext, Credential::Passphrase(passphrase))
    }

    pub fn decrypt_transparent(&self, envelope: &str) -> Result<String> {
        self.decrypt(envelope, Credential::DeviceKey)
    }

    pub fn decrypt_with_passphrase(&self, envelope: &str, passphrase: &str) -> Result<String> {
        self.decrypt(envelope, Credential::Passphrase(passphrase))
    }

    /// Seal `plaintext` and return the envelope text
    pub fn encrypt(&self, plaintext: &str, credential: Credential<'_>) -> Result<String> {
        let key = match credential {
            Credential::DeviceKey => self.keys.device_key()?,
            Credential::Passphrase(passphrase) => {
                self.keys.derive_from_passphrase(passphrase, &generate_salt())
            }
        };

        Ok(crypto::seal(plaintext.as_bytes(), &key)?.encode())
    }

    /// Open envelope text with the given credential
    pub fn decrypt(&self, envelope: &str, credential: Credential<'_>) -> Result<String> {
        let envelope = CipherEnvelope::parse(envelope)?;

        if envelope.mode() != credential.mode() {
            return Err(KeyVaultError::ModeMismatch {
                expected: credential.mode(),
                found: envelope.mode(),
            });
        }

        let key = self.key_for(&envelope, credential)?;
        let plaintext = crypto::open(&envelope, &key)?;

        String::from_utf8(plaintext).map_err(|_| KeyVaultError::InvalidUtf8)
    }

    /// Move content to another credential: decrypt fully, then re-encrypt.
    pub fn reseal(&self, envelope: &str, from: Credential<'_>, to: Credential<'_>) -> Result<String> {
        let plaintext = zeroize::Zeroizing::new(self.decrypt(envelope, from)?);
        self.encrypt(&plaintext, to)
    }

    fn key_for(&self, envelope: &CipherEnvelope, credential: Credential<'_>) -> Result<NoteKey> {
        match (credential, envelope.salt()) {
            (Credential::DeviceKey, None) => self.keys.device_key(),
            (Credential::Passphrase(passphrase), Some(salt)) => {
                Ok(self.keys.derive_from_passphrase(passphrase, salt))
            }
            _ => Err(KeyVaultError::ModeMismatch {
                expected: credential.mode(),
                found: envelope.mode(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;

    fn service() -> NoteCryptoService {
        NoteCryptoService::new(KeyProvider::new(MemoryKeyStore::new()))
    }

    #[test]
    fn test_passphrase_scenario() {
        let svc = service();
        let text = "secret line 1\nsecret line 2";

        let envelope = svc.encrypt_with_passphrase(text, "hunter2").unwrap();
        assert_eq!(EncryptionMode::detect(&envelope), EncryptionMode::Passphrase);

        assert_eq!(svc.decrypt_with_passphrase(&envelope, "hunter2").unwrap(), text);
        assert!(matches!(
            svc.decrypt_with_passphrase(&envelope, "wrong"),
            Err(KeyVaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_transparent_roundtrip() {
        let svc = service();
        let envelope = svc.encrypt_transparent("grocery list").unwrap();

        assert!(!envelope.contains(':'));
        assert_eq!(svc.decrypt_transparent(&envelope).unwrap(), "grocery list");
    }

    #[test]
    fn test_same_passphrase_new_salt_each_time() {
        let svc = service();
        let a = svc.encrypt_with_passphrase("same", "pw").unwrap();
        let b = svc.encrypt_with_passphrase("same", "pw").unwrap();

        let salt_a = a.split_once(':').unwrap().0;
        let salt_b = b.split_once(':').unwrap().0;
        assert_ne!(salt_a, salt_b);
    }

    #[test]
    fn test_other_device_cannot_open_transparent_envelope() {
        let envelope = service().encrypt_transparent("bound to this device").unwrap();
        assert!(matches!(
            service().decrypt_transparent(&envelope),
            Err(KeyVaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_mode_mismatch_is_reported() {
        let svc = service();
        let envelope = svc.encrypt_with_passphrase("x", "pw").unwrap();

        let err = svc.decrypt_transparent(&envelope).unwrap_err();
        assert!(matches!(
            err,
            KeyVaultError::ModeMismatch {
                expected: EncryptionMode::DeviceKey,
                found: EncryptionMode::Passphrase
            }
        ));
    }

    #[test]
    fn test_reseal_between_modes() {
        let svc = service();
        let device = svc.encrypt_transparent("move me").unwrap();

        let locked = svc
            .reseal(&device, Credential::DeviceKey, Credential::Passphrase("pw"))
            .unwrap();
        assert_eq!(svc.decrypt_with_passphrase(&locked, "pw").unwrap(), "move me");

        let changed = svc
            .reseal(&locked, Credential::Passphrase("pw"), Credential::Passphrase("new"))
            .unwrap();
        assert!(svc.decrypt_with_passphrase(&changed, "pw").is_err());
        assert_eq!(svc.decrypt_with_passphrase(&changed, "new").unwrap(), "move me");
    }

    #[test]
    fn test_reseal_with_wrong_passphrase_fails_before_reencrypting() {
        let svc = service();
        let locked = svc.encrypt_with_passphrase("keep", "pw").unwrap();

        let result = svc.reseal(&locked, Credential::Passphrase("nope"), Credential::DeviceKey);
        assert!(matches!(result, Err(KeyVaultError::AuthenticationFailed)));
    }
}
