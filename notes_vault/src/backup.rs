//! Notes Vault - Backup & Restore
//!
//! Full-set backups only. Restore replaces everything in the store and
//! never decrypts: encrypted notes come back encrypted.

use std::path::Path;

use crate::archive::{self, ArchiveSummary, BackupData};
use crate::catalog::{BackupCatalog, BackupEntry};
use crate::error::VaultResult;
use crate::store::NoteStore;

/// Outcome of a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreReport {
    pub notes: usize,
    pub labels: usize,
    pub links: usize,
    pub encrypted_notes: usize,
}

impl From<ArchiveSummary> for RestoreReport {
    fn from(s: ArchiveSummary) -> Self {
        Self {
            notes: s.notes,
            labels: s.labels,
            links: s.links,
            encrypted_notes: s.encrypted_notes,
        }
    }
}

/// Result of one backup run
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub entry: BackupEntry,
    pub summary: ArchiveSummary,
    /// Archives removed by retention
    pub pruned: Vec<BackupEntry>,
}

/// Backup job over a catalog
pub struct BackupJob {
    catalog: BackupCatalog,
    max_backups: Option<usize>,
}

impl BackupJob {
    pub fn new(catalog: BackupCatalog) -> Self {
        Self {
            catalog,
            max_backups: None,
        }
    }

    /// Keep at most `max` archives after each run
    pub fn with_max_backups(mut self, max: Option<usize>) -> Self {
        self.max_backups = max.map(|m| m.max(1));
        self
    }

    pub fn catalog(&self) -> &BackupCatalog {
        &self.catalog
    }

    /// Snapshot the store, pack it and save it as a new archive
    pub fn run_once(&self, store: &dyn NoteStore) -> VaultResult<BackupOutcome> {
        let data = BackupData::new(store.all_notes()?, store.all_labels()?, store.all_links()?);
        let summary = data.summary();

        let bytes = archive::pack(&data)?;
        let entry = self.catalog.save(&bytes)?;

        let pruned = match self.max_backups {
            Some(keep) => self.catalog.prune_except(keep, &entry.path)?,
            None => Vec::new(),
        };

        log::info!(
            "backup {}: {} notes, {} labels, {} links",
            entry.name,
            summary.notes,
            summary.labels,
            summary.links
        );

        Ok(BackupOutcome {
            entry,
            summary,
            pruned,
        })
    }

    /// Replace the store's contents with an archive.
    ///
    /// The archive is fully decoded before anything is deleted, so an
    /// invalid archive leaves the store untouched.
    pub fn restore(&self, store: &mut dyn NoteStore, bytes: &[u8]) -> VaultResult<RestoreReport> {
        let data = archive::unpack(bytes)?;
        let report = RestoreReport::from(data.summary());

        store.delete_all_notes()?;
        store.delete_all_labels()?;

        for label in data.labels {
            store.insert_label(label)?;
        }
        for note in data.notes {
            store.insert_note(note)?;
        }
        for link in data.note_label_cross_refs {
            store.insert_link(link)?;
        }

        log::info!(
            "restored {} notes ({} encrypted), {} labels, {} links",
            report.notes,
            report.encrypted_notes,
            report.labels,
            report.links
        );
        Ok(report)
    }

    /// Restore from a catalog locator
    pub fn restore_from(&self, store: &mut dyn NoteStore, locator: &Path) -> VaultResult<RestoreReport> {
        let bytes = self.catalog.open(locator)?;
        self.restore(store, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::model::{Label, Note, NoteLabelLink};
    use crate::store::MemoryStore;
    use tempfile::tempdir;

    /// Records call order to check restore sequencing
    #[derive(Default)]
    struct RecordingStore {
        inner: MemoryStore,
        calls: Vec<&'static str>,
    }

    impl NoteStore for RecordingStore {
        fn all_notes(&self) -> VaultResult<Vec<Note>> {
            self.inner.all_notes()
        }
        fn all_labels(&self) -> VaultResult<Vec<Label>> {
            self.inner.all_labels()
        }
        fn all_links(&self) -> VaultResult<Vec<NoteLabelLink>> {
            self.inner.all_links()
        }
        fn insert_note(&mut self, note: Note) -> VaultResult<()> {
            self.calls.push("note");
            self.inner.insert_note(note)
        }
        fn insert_label(&mut self, label: Label) -> VaultResult<()> {
            self.calls.push("label");
            self.inner.insert_label(label)
        }
        fn insert_link(&mut self, link: NoteLabelLink) -> VaultResult<()> {
            self.calls.push("link");
            self.inner.insert_link(link)
        }
        fn delete_all_notes(&mut self) -> VaultResult<()> {
            self.calls.push("clear");
            self.inner.delete_all_notes()
        }
        fn delete_all_labels(&mut self) -> VaultResult<()> {
            self.calls.push("clear");
            self.inner.delete_all_labels()
        }
    }

    fn populated() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_label(Label::new(1, "Work")).unwrap();
        store.insert_note(Note::new(1, "a")).unwrap();
        store.insert_note(Note::new(2, "b")).unwrap();
        store.insert_link(NoteLabelLink::new(1, 1)).unwrap();
        store.insert_link(NoteLabelLink::new(2, 1)).unwrap();
        store
    }

    #[test]
    fn test_restore_order() {
        let dir = tempdir().unwrap();
        let job = BackupJob::new(BackupCatalog::new(dir.path()));
        let source = populated();
        let outcome = job.run_once(&source).unwrap();

        let mut target = RecordingStore::default();
        let report = job.restore_from(&mut target, &outcome.entry.path).unwrap();

        assert_eq!(target.calls, vec!["clear", "clear", "label", "note", "note", "link", "link"]);
        assert_eq!(report.notes, 2);
        assert_eq!(report.links, 2);
        assert_eq!(target.inner, source);
    }

    #[test]
    fn test_invalid_archive_touches_nothing() {
        let dir = tempdir().unwrap();
        let job = BackupJob::new(BackupCatalog::new(dir.path()));

        let source = populated();
        let mut target = RecordingStore {
            inner: source.clone(),
            calls: Vec::new(),
        };
        let err = job.restore(&mut target, b"PK\x03\x04 truncated").unwrap_err();

        assert!(matches!(err, VaultError::InvalidArchiveFormat(_)));
        assert!(target.calls.is_empty());
        assert_eq!(target.inner, source);
    }

    #[test]
    fn test_retention() {
        let dir = tempdir().unwrap();
        let catalog = BackupCatalog::new(dir.path());
        for _ in 0..3 {
            catalog.save(b"old").unwrap();
        }

        let job = BackupJob::new(BackupCatalog::new(dir.path())).with_max_backups(Some(2));
        let outcome = job.run_once(&populated()).unwrap();

        assert_eq!(outcome.pruned.len(), 2);
        let remaining = job.catalog().list().unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().any(|e| e.name == outcome.entry.name));
    }

    #[test]
    fn test_retention_never_removes_new_archive() {
        let dir = tempdir().unwrap();
        let ahead = dir.path().join("notes_backup_29990101_000000.zip");
        std::fs::write(&ahead, b"archive with a later clock").unwrap();

        let job = BackupJob::new(BackupCatalog::new(dir.path())).with_max_backups(Some(1));
        let outcome = job.run_once(&populated()).unwrap();

        assert!(outcome.entry.path.exists());
        assert!(!ahead.exists());
        let pruned: Vec<&str> = outcome.pruned.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(pruned, vec!["notes_backup_29990101_000000.zip"]);
        assert!(job.restore_from(&mut MemoryStore::new(), &outcome.entry.path).is_ok());
    }
}
