//! Device-bound key storage and the key provider
//!
//! The device key is generated once and persisted in a [`KeyStore`]:
//! the platform credential service, an owner-only key file, or memory.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::{Mutex, RwLock};

use crate::crypto::kdf;
use crate::crypto::keys::{KeyOrigin, NoteKey, KEY_LEN, SALT_LEN};
use crate::error::{KeyVaultError, Result};

/// Default service name in the platform credential store
pub const DEFAULT_SERVICE: &str = "notes-vault";

/// Account name under which the device key is kept
pub const DEVICE_KEY_ACCOUNT: &str = "device_key";

/// Persistent home of the device-bound key
pub trait KeyStore: Send + Sync {
    /// Load the device key, `None` if none has been created yet
    fn load(&self) -> Result<Option<NoteKey>>;

    /// Persist a newly generated device key
    fn store(&self, key: &NoteKey) -> Result<()>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> KeyVaultError {
    KeyVaultError::KeyStoreUnavailable(format!("{}: {}", context, e))
}

fn key_from_bytes(bytes: &[u8]) -> Result<NoteKey> {
    let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
        KeyVaultError::KeyStoreUnavailable(format!(
            "stored device key has {} bytes, expected {}",
            bytes.len(),
            KEY_LEN
        ))
    })?;
    Ok(NoteKey::new(arr, KeyOrigin::DeviceKey))
}

// ═══════════════════════════════════════════════════════════════════════════
// Platform credential store (Keychain / Credential Manager / Secret Service)
// ═══════════════════════════════════════════════════════════════════════════

pub struct OsKeyStore {
    service: String,
    account: String,
}

impl OsKeyStore {
    pub fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            account: DEVICE_KEY_ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account).map_err(|e| unavailable("keyring init", e))
    }
}

impl Default for OsKeyStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl KeyStore for OsKeyStore {
    fn load(&self) -> Result<Option<NoteKey>> {
        match self.entry()?.get_password() {
            Ok(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| unavailable("decode device key", e))?;
                key_from_bytes(&bytes).map(Some)
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(unavailable("load device key", e)),
        }
    }

    fn store(&self, key: &NoteKey) -> Result<()> {
        let encoded = STANDARD.encode(key.expose());
        self.entry()?
            .set_password(&encoded)
            .map_err(|e| unavailable("store device key", e))
    }

    fn backend(&self) -> &'static str {
        "os-keyring"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Owner-only key file
// ═══════════════════════════════════════════════════════════════════════════

pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileKeyStore {
    /// Hidden per-process sibling the key is written to before linking
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path
            .with_file_name(format!(".{}.{}.partial", name, std::process::id()))
    }

    fn write_staging(&self, staging: &Path, key: &NoteKey) -> std::io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(staging)?;
        file.write_all(key.expose())?;
        file.sync_all()
    }

    /// Move the staged key to `path`. An existing complete key wins; an
    /// empty leftover is replaced.
    fn publish(&self, staging: &Path) -> std::io::Result<()> {
        match fs::hard_link(staging, &self.path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = fs::metadata(&self.path)?.len();
                if existing == 0 {
                    tracing::warn!(path = %self.path.display(), "replacing empty key file");
                    fs::rename(staging, &self.path)
                } else {
                    Err(e)
                }
            }
            other => other,
        }
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<NoteKey>> {
        match fs::read(&self.path) {
            // Left behind by an interrupted write; never held a key
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => key_from_bytes(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable(&format!("read {}", self.path.display()), e)),
        }
    }

    fn store(&self, key: &NoteKey) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| unavailable(&format!("create {}", parent.display()), e))?;
        }

        // The key only appears at `path` once fully written and synced
        let staging = self.staging_path();
        let result = self
            .write_staging(&staging, key)
            .and_then(|_| self.publish(&staging));
        let _ = fs::remove_file(&staging);

        result.map_err(|e| unavailable(&format!("write {}", self.path.display()), e))
    }

    fn backend(&self) -> &'static str {
        "key-file"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Process-local store (tests, throwaway sessions)
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<NoteKey>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<NoteKey>> {
        Ok(self.key.lock().clone())
    }

    fn store(&self, key: &NoteKey) -> Result<()> {
        *self.key.lock() = Some(key.clone());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Key provider
// ═══════════════════════════════════════════════════════════════════════════

/// Produces keys for both protection modes
pub struct KeyProvider {
    store: Box<dyn KeyStore>,
    device_key: RwLock<Option<NoteKey>>,
}

impl KeyProvider {
    pub fn new(store: impl KeyStore + 'static) -> Self {
        Self::from_boxed(Box::new(store))
    }

    pub fn from_boxed(store: Box<dyn KeyStore>) -> Self {
        Self {
            store,
            device_key: RwLock::new(None),
        }
    }

    /// The device-bound key, generated and persisted on first use.
    ///
    /// Repeated calls return the same key without regenerating it.
    pub fn device_key(&self) -> Result<NoteKey> {
        if let Some(key) = self.device_key.read().as_ref() {
            return Ok(key.clone());
        }

        let mut slot = self.device_key.write();
        if let Some(key) = slot.as_ref() {
            return Ok(key.clone());
        }

        let key = match self.store.load()? {
            Some(key) => {
                tracing::debug!(backend = self.store.backend(), "device key loaded");
                key
            }
            None => self.create_device_key()?,
        };

        *slot = Some(key.clone());
        Ok(key)
    }

    fn create_device_key(&self) -> Result<NoteKey> {
        let key = NoteKey::generate_device();

        match self.store.store(&key) {
            Ok(()) => {
                tracing::info!(backend = self.store.backend(), "device key generated");
                Ok(key)
            }
            // Another process may have won the race to create it.
            Err(e) => match self.store.load() {
                Ok(Some(existing)) => Ok(existing),
                _ => Err(e),
            },
        }
    }

    /// Derive a passphrase key. See [`kdf::derive_from_passphrase`].
    pub fn derive_from_passphrase(&self, passphrase: &str, salt: &[u8; SALT_LEN]) -> NoteKey {
        kdf::derive_from_passphrase(passphrase, salt)
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}
