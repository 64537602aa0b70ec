//! Notes Vault - Configuration

use std::fs;
use std::path::{Path, PathBuf};

use notes_keyvault::{FileKeyStore, KeyProvider, MemoryKeyStore, OsKeyStore};
use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Application directory name under the platform data dir
pub const APP_DIR: &str = "notes-vault";

/// Where the device key lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreBackend {
    /// Platform credential store
    #[default]
    Os,
    /// Owner-only key file
    File,
    /// Process memory; notes become unreadable on exit
    Memory,
}

impl std::str::FromStr for KeyStoreBackend {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "os" => Ok(Self::Os),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(VaultError::Config(format!("unknown key store '{}'", other))),
        }
    }
}

/// Auto-backup frequency preference. Scheduling itself is external.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl BackupFrequency {
    pub fn interval_days(self) -> u32 {
        match self {
            BackupFrequency::Daily => 1,
            BackupFrequency::Weekly => 7,
            BackupFrequency::Monthly => 30,
        }
    }
}

/// Vault configuration (JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Root for backups and the key file
    pub data_dir: PathBuf,
    pub key_store: KeyStoreBackend,
    /// Key file path; `<data_dir>/device.key` when unset
    pub key_file: Option<PathBuf>,
    /// Retention for catalog archives; unlimited when unset
    pub max_backups: Option<usize>,
    pub auto_backup: bool,
    pub backup_frequency: BackupFrequency,
}

impl Default for VaultConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            data_dir,
            key_store: KeyStoreBackend::default(),
            key_file: None,
            max_backups: None,
            auto_backup: false,
            backup_frequency: BackupFrequency::default(),
        }
    }
}

impl VaultConfig {
    /// Load from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> VaultResult<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| VaultError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> VaultResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }

    pub fn key_file(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("device.key"))
    }

    /// Key provider over the configured backend
    pub fn open_key_store(&self) -> KeyProvider {
        match self.key_store {
            KeyStoreBackend::Os => KeyProvider::new(OsKeyStore::default()),
            KeyStoreBackend::File => KeyProvider::new(FileKeyStore::new(self.key_file())),
            KeyStoreBackend::Memory => KeyProvider::new(MemoryKeyStore::new()),
        }
    }
}
