//! Notes Vault - Archive Codec
//!
//! Format of a backup file:
//! ```text
//! notes_backup_<yyyyMMdd_HHmmss>.zip
//! └── backup.json   { "version", "notes", "labels",
//!                     "noteLabelCrossRefs", "backupDate" }
//! ```
//! The document is stored as-is: encrypted notes stay encrypted.

use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{VaultError, VaultResult};
use crate::model::{Label, Note, NoteLabelLink, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name of the single document entry inside the archive
pub const ENTRY_NAME: &str = "backup.json";

/// Current document version. Documents without a version are version 1.
pub const FORMAT_VERSION: u32 = 1;

/// Upper bound on the decompressed document size (256 MiB)
const MAX_DOCUMENT_SIZE: u64 = 256 * 1024 * 1024;

fn default_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Full snapshot of the note/label/link graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub note_label_cross_refs: Vec<NoteLabelLink>,
    pub backup_date: Timestamp,
}

impl BackupData {
    /// Snapshot stamped with the current time
    pub fn new(notes: Vec<Note>, labels: Vec<Label>, links: Vec<NoteLabelLink>) -> Self {
        Self {
            version: FORMAT_VERSION,
            notes,
            labels,
            note_label_cross_refs: links,
            backup_date: Timestamp::now(),
        }
    }

    pub fn summary(&self) -> ArchiveSummary {
        ArchiveSummary {
            backup_date: self.backup_date,
            notes: self.notes.len(),
            encrypted_notes: self.notes.iter().filter(|n| n.is_encrypted).count(),
            labels: self.labels.len(),
            links: self.note_label_cross_refs.len(),
        }
    }
}

/// Counts shown when inspecting an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub backup_date: Timestamp,
    pub notes: usize,
    pub encrypted_notes: usize,
    pub labels: usize,
    pub links: usize,
}

// ---------------------------------------------------------------------------
// Pack / unpack
// ---------------------------------------------------------------------------

/// Serialize `data` and wrap it as the single entry of a zip archive.
///
/// The entry timestamp is fixed, so identical input gives identical bytes.
pub fn pack(data: &BackupData) -> VaultResult<Vec<u8>> {
    let document = serde_json::to_vec(data)?;

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(ENTRY_NAME, options).map_err(archive_error)?;
    zip.write_all(&document)?;
    let cursor = zip.finish().map_err(archive_error)?;

    Ok(cursor.into_inner())
}

/// Locate and parse the document inside an archive.
///
/// Fails with [`VaultError::InvalidArchiveFormat`] when the container is
/// unreadable, the entry is missing or the document does not parse.
pub fn unpack(bytes: &[u8]) -> VaultResult<BackupData> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;

    let entry = archive.by_name(ENTRY_NAME).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => {
            VaultError::InvalidArchiveFormat(format!("archive has no {} entry", ENTRY_NAME))
        }
        other => archive_error(other),
    })?;

    if entry.size() > MAX_DOCUMENT_SIZE {
        return Err(VaultError::InvalidArchiveFormat(format!(
            "{} is too large ({} bytes)",
            ENTRY_NAME,
            entry.size()
        )));
    }

    let mut document = Vec::with_capacity(entry.size() as usize);
    entry
        .take(MAX_DOCUMENT_SIZE)
        .read_to_end(&mut document)
        .map_err(|e| VaultError::InvalidArchiveFormat(format!("cannot read {}: {}", ENTRY_NAME, e)))?;

    let data: BackupData = serde_json::from_slice(&document)
        .map_err(|e| VaultError::InvalidArchiveFormat(format!("malformed {}: {}", ENTRY_NAME, e)))?;

    if data.version > FORMAT_VERSION {
        return Err(VaultError::UnsupportedArchiveVersion {
            found: data.version,
            supported: FORMAT_VERSION,
        });
    }

    Ok(data)
}

fn archive_error(e: zip::result::ZipError) -> VaultError {
    VaultError::InvalidArchiveFormat(e.to_string())
}
