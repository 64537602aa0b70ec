//! # Notes Vault
//!
//! Encrypted notes with portable zip backups.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       NOTES VAULT                        │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  │
//! │  │   PROTECT    │   │  BACKUP JOB  │   │    CONFIG    │  │
//! │  │ lock/unlock  │   │ run / restore│   │  JSON prefs  │  │
//! │  └──────┬───────┘   └──────┬───────┘   └──────────────┘  │
//! │         │           ┌──────┴───────┐                     │
//! │         │           │   ARCHIVE    │──▶ BACKUP CATALOG   │
//! │         │           │ backup.json  │    notes_backup_*   │
//! │  ┌──────┴───────┐   └──────────────┘                     │
//! │  │ NOTES_KEYVAULT  device key / PBKDF2 + AES-256-GCM  │  │
//! │  └──────────────┘                                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Model
//!
//! - Note content is sealed with AES-256-GCM before it reaches storage
//! - Archives carry notes exactly as stored; encrypted notes stay encrypted
//! - A restore validates the whole archive before touching existing data

pub mod archive;
pub mod backup;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod protect;
pub mod store;

pub use archive::{ArchiveSummary, BackupData};
pub use backup::{BackupJob, BackupOutcome, RestoreReport};
pub use catalog::{BackupCatalog, BackupEntry};
pub use config::{BackupFrequency, KeyStoreBackend, VaultConfig};
pub use error::{VaultError, VaultResult};
pub use model::{Label, Note, NoteLabelLink, Timestamp};
pub use store::{MemoryStore, NoteStore};

pub use notes_keyvault::{Credential, EncryptionMode, KeyProvider, NoteCryptoService};

/// Notes Vault version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
