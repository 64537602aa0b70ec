//! Notes Vault - Storage Collaborator
//!
//! The backup job only needs full-set reads, bulk clears and inserts.
//! [`MemoryStore`] keeps everything in insertion order and can be saved
//! to a JSON file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VaultResult;
use crate::model::{Label, Note, NoteLabelLink};

/// Persistence contract used by backup and restore
pub trait NoteStore {
    fn all_notes(&self) -> VaultResult<Vec<Note>>;
    fn all_labels(&self) -> VaultResult<Vec<Label>>;
    fn all_links(&self) -> VaultResult<Vec<NoteLabelLink>>;

    /// Insert or replace by id
    fn insert_note(&mut self, note: Note) -> VaultResult<()>;
    /// Insert or replace by id
    fn insert_label(&mut self, label: Label) -> VaultResult<()>;
    /// Inserting an existing link is a no-op
    fn insert_link(&mut self, link: NoteLabelLink) -> VaultResult<()>;

    /// Removes all notes and every link
    fn delete_all_notes(&mut self) -> VaultResult<()>;
    /// Removes all labels and every link
    fn delete_all_labels(&mut self) -> VaultResult<()>;
}

/// In-memory store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStore {
    #[serde(default)]
    notes: Vec<Note>,
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(default)]
    note_label_cross_refs: Vec<NoteLabelLink>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; a missing file is an empty store
    pub fn load_json(path: &Path) -> VaultResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_json(&self, path: &Path) -> VaultResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn note(&self, id: i64) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn next_note_id(&self) -> i64 {
        self.notes.iter().map(|n| n.id).max().unwrap_or(0) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.labels.is_empty() && self.note_label_cross_refs.is_empty()
    }
}

impl NoteStore for MemoryStore {
    fn all_notes(&self) -> VaultResult<Vec<Note>> {
        Ok(self.notes.clone())
    }

    fn all_labels(&self) -> VaultResult<Vec<Label>> {
        Ok(self.labels.clone())
    }

    fn all_links(&self) -> VaultResult<Vec<NoteLabelLink>> {
        Ok(self.note_label_cross_refs.clone())
    }

    fn insert_note(&mut self, note: Note) -> VaultResult<()> {
        match self.notes.iter_mut().find(|n| n.id == note.id) {
            Some(existing) => *existing = note,
            None => self.notes.push(note),
        }
        Ok(())
    }

    fn insert_label(&mut self, label: Label) -> VaultResult<()> {
        match self.labels.iter_mut().find(|l| l.id == label.id) {
            Some(existing) => *existing = label,
            None => self.labels.push(label),
        }
        Ok(())
    }

    fn insert_link(&mut self, link: NoteLabelLink) -> VaultResult<()> {
        if !self.note_label_cross_refs.contains(&link) {
            self.note_label_cross_refs.push(link);
        }
        Ok(())
    }

    fn delete_all_notes(&mut self) -> VaultResult<()> {
        self.notes.clear();
        self.note_label_cross_refs.clear();
        Ok(())
    }

    fn delete_all_labels(&mut self) -> VaultResult<()> {
        self.labels.clear();
        self.note_label_cross_refs.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_insert_replaces_by_id() {
        let mut store = MemoryStore::new();
        store.insert_note(Note::new(1, "first")).unwrap();
        store.insert_note(Note::new(2, "second")).unwrap();
        store.insert_note(Note::new(1, "edited")).unwrap();

        let notes = store.all_notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "edited");
        assert_eq!(store.next_note_id(), 3);
    }

    #[test]
    fn test_links_idempotent_and_cleared() {
        let mut store = MemoryStore::new();
        store.insert_link(NoteLabelLink::new(1, 1)).unwrap();
        store.insert_link(NoteLabelLink::new(1, 1)).unwrap();
        assert_eq!(store.all_links().unwrap().len(), 1);

        store.delete_all_labels().unwrap();
        assert!(store.all_links().unwrap().is_empty());
    }

    #[test]
    fn test_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data/notes.json");
        assert!(MemoryStore::load_json(&path).unwrap().is_empty());

        let mut store = MemoryStore::new();
        store.insert_note(Note::new(1, "kept")).unwrap();
        store.insert_label(Label::new(1, "Home")).unwrap();
        store.insert_link(NoteLabelLink::new(1, 1)).unwrap();
        store.save_json(&path).unwrap();

        assert_eq!(MemoryStore::load_json(&path).unwrap(), store);
    }
}
