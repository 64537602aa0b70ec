//! Notes Vault - Note Protection
//!
//! Applies the crypto service to whole notes: lock, unlock, read and
//! switch modes. Every call returns a new value; the input note is never
//! modified in place.

use notes_keyvault::{Credential, EncryptionMode, NoteCryptoService};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::model::{Note, Timestamp};

/// Protection mode of an encrypted note.
///
/// The stored `encryption_mode` wins. Notes from older archives lack it,
/// in which case the envelope format is sniffed.
pub fn note_mode(note: &Note) -> Option<EncryptionMode> {
    if !note.is_encrypted {
        return None;
    }

    match note.encryption_mode {
        Some(mode) => Some(mode),
        None => {
            let mode = EncryptionMode::detect(&note.content);
            log::warn!("note {} has no recorded encryption mode, envelope suggests {}", note.id, mode);
            Some(mode)
        }
    }
}

/// Encrypt a plaintext note under `credential`
pub fn lock_note(
    crypto: &NoteCryptoService,
    note: &Note,
    credential: Credential<'_>,
) -> VaultResult<Note> {
    if note.is_encrypted {
        return Err(VaultError::AlreadyEncrypted(note.id));
    }

    let envelope = crypto.encrypt(&note.content, credential)?;
    log::debug!("note {} locked ({})", note.id, credential.mode());

    Ok(Note {
        content: envelope,
        is_encrypted: true,
        encryption_mode: Some(credential.mode()),
        modified_at: Timestamp::now(),
        ..note.clone()
    })
}

/// Decrypt a note into a plaintext copy. Plaintext notes pass through.
pub fn unlock_note(
    crypto: &NoteCryptoService,
    note: &Note,
    credential: Credential<'_>,
) -> VaultResult<Note> {
    if !note.is_encrypted {
        return Ok(note.clone());
    }

    let content = read_note(crypto, note, credential)?;

    Ok(Note {
        content,
        is_encrypted: false,
        encryption_mode: None,
        modified_at: Timestamp::now(),
        ..note.clone()
    })
}

/// Plaintext view of a note without changing its protection
pub fn read_note(
    crypto: &NoteCryptoService,
    note: &Note,
    credential: Credential<'_>,
) -> VaultResult<String> {
    if !note.is_encrypted {
        return Ok(note.content.clone());
    }

    check_mode(note, credential)?;
    Ok(crypto.decrypt(&note.content, credential)?)
}

/// Switch an encrypted note to another credential (decrypt, then encrypt).
///
/// Plaintext notes are rejected; use [`lock_note`] to protect them.
pub fn relock_note(
    crypto: &NoteCryptoService,
    note: &Note,
    from: Credential<'_>,
    to: Credential<'_>,
) -> VaultResult<Note> {
    if !note.is_encrypted {
        return Err(VaultError::NotEncrypted(note.id));
    }

    let plaintext = Zeroizing::new(read_note(crypto, note, from)?);
    let envelope = crypto.encrypt(&plaintext, to)?;

    Ok(Note {
        content: envelope,
        is_encrypted: true,
        encryption_mode: Some(to.mode()),
        modified_at: Timestamp::now(),
        ..note.clone()
    })
}

fn check_mode(note: &Note, credential: Credential<'_>) -> VaultResult<()> {
    match note_mode(note) {
        Some(found) if found != credential.mode() => Err(VaultError::ModeMismatch {
            expected: credential.mode(),
            found,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notes_keyvault::{KeyProvider, MemoryKeyStore};

    fn crypto() -> NoteCryptoService {
        NoteCryptoService::new(KeyProvider::new(MemoryKeyStore::new()))
    }

    #[test]
    fn test_lock_unlock_passphrase() {
        let svc = crypto();
        let note = Note::new(1, "diary\ndear diary");

        let locked = lock_note(&svc, &note, Credential::Passphrase("hunter2")).unwrap();
        assert!(locked.is_encrypted);
        assert_eq!(locked.encryption_mode, Some(EncryptionMode::Passphrase));
        assert_ne!(locked.content, note.content);
        assert_eq!(locked.id, note.id);
        assert_eq!(locked.created_at, note.created_at);

        let unlocked = unlock_note(&svc, &locked, Credential::Passphrase("hunter2")).unwrap();
        assert!(!unlocked.is_encrypted);
        assert_eq!(unlocked.content, "diary\ndear diary");

        assert!(matches!(
            unlock_note(&svc, &locked, Credential::Passphrase("wrong")),
            Err(VaultError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_lock_twice_rejected() {
        let svc = crypto();
        let locked = lock_note(&svc, &Note::new(9, "x"), Credential::DeviceKey).unwrap();

        assert!(matches!(
            lock_note(&svc, &locked, Credential::DeviceKey),
            Err(VaultError::AlreadyEncrypted(9))
        ));
    }

    #[test]
    fn test_stored_mode_wins_over_sniffing() {
        let svc = crypto();
        let locked = lock_note(&svc, &Note::new(1, "x"), Credential::DeviceKey).unwrap();

        let err = read_note(&svc, &locked, Credential::Passphrase("pw")).unwrap_err();
        assert!(matches!(
            err,
            VaultError::ModeMismatch {
                expected: EncryptionMode::Passphrase,
                found: EncryptionMode::DeviceKey
            }
        ));
    }

    #[test]
    fn test_legacy_note_mode_is_sniffed() {
        let svc = crypto();
        let mut locked = lock_note(&svc, &Note::new(1, "old"), Credential::Passphrase("pw")).unwrap();
        locked.encryption_mode = None;

        assert_eq!(note_mode(&locked), Some(EncryptionMode::Passphrase));
        assert_eq!(read_note(&svc, &locked, Credential::Passphrase("pw")).unwrap(), "old");
    }

    #[test]
    fn test_relock_device_to_passphrase() {
        let svc = crypto();
        let device = lock_note(&svc, &Note::new(5, "move"), Credential::DeviceKey).unwrap();

        let moved = relock_note(&svc, &device, Credential::DeviceKey, Credential::Passphrase("pw")).unwrap();
        assert_eq!(moved.encryption_mode, Some(EncryptionMode::Passphrase));
        assert_eq!(read_note(&svc, &moved, Credential::Passphrase("pw")).unwrap(), "move");
    }

    #[test]
    fn test_relock_rejects_plaintext_note() {
        let svc = crypto();
        let note = Note::new(6, "never locked");

        assert!(matches!(
            relock_note(&svc, &note, Credential::DeviceKey, Credential::Passphrase("pw")),
            Err(VaultError::NotEncrypted(6))
        ));
    }

    #[test]
    fn test_plaintext_passes_through() {
        let svc = crypto();
        let note = Note::new(2, "open");
        assert_eq!(unlock_note(&svc, &note, Credential::DeviceKey).unwrap(), note);
        assert_eq!(read_note(&svc, &note, Credential::Passphrase("any")).unwrap(), "open");
        assert_eq!(note_mode(&note), None);
    }
}
