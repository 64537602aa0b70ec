//! PBKDF2-HMAC-SHA256 for deriving note keys from a passphrase

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use super::keys::{KeyOrigin, NoteKey, KEY_LEN, SALT_LEN};

/// Iteration count. Fixed: envelopes do not record it, so changing it
/// would make every existing passphrase envelope unreadable.
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Derive a 256-bit key from a passphrase and salt.
///
/// Same passphrase and salt always give the same key; a different salt
/// gives an unrelated key even for the same passphrase.
pub fn derive_from_passphrase(passphrase: &str, salt: &[u8; SALT_LEN]) -> NoteKey {
    let mut output = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut output);

    NoteKey::new(output, KeyOrigin::Passphrase { salt: *salt })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_salt;

    #[test]
    fn test_derive_deterministic() {
        let salt = [1u8; SALT_LEN];

        let k1 = derive_from_passphrase("test_password", &salt);
        let k2 = derive_from_passphrase("test_password", &salt);

        assert_eq!(k1.expose(), k2.expose());
        assert_eq!(k1.origin(), KeyOrigin::Passphrase { salt });
    }

    #[test]
    fn test_different_salts_different_keys() {
        let s1 = generate_salt();
        let s2 = generate_salt();
        assert_ne!(s1, s2);

        let k1 = derive_from_passphrase("hunter2", &s1);
        let k2 = derive_from_passphrase("hunter2", &s2);

        assert_ne!(k1.expose(), k2.expose());
    }

    #[test]
    fn test_different_passphrases_different_keys() {
        let salt = [7u8; SALT_LEN];
        let k1 = derive_from_passphrase("hunter2", &salt);
        let k2 = derive_from_passphrase("hunter3", &salt);
        assert_ne!(k1.expose(), k2.expose());
    }
}
