//! Notes Vault - Data Model
//!
//! Value snapshots of the storage collaborator's entities. JSON field names
//! match the archive document (`isEncrypted`, `noteId`, ...).

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use notes_keyvault::EncryptionMode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Title shown for notes whose first line is empty
pub const UNTITLED: &str = "Untitled";

/// Max characters of the second line shown as summary
pub const SUMMARY_LEN: usize = 50;

/// UTC instant at millisecond precision, the resolution archives store.
///
/// Every constructor truncates, so a value always survives a JSON round
/// trip unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&iso8601::format(&self.0))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&iso8601::format(&self.0))
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        iso8601::parse(&s)
            .map(Self::from)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {:?}: {}", s, e)))
    }
}

/// A note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Surrogate id, immutable once assigned
    pub id: i64,
    /// Plain text, or an envelope when `is_encrypted`
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_encrypted: bool,
    /// Protection mode; absent in archives written by older versions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_mode: Option<EncryptionMode>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

impl Note {
    /// New plaintext note stamped with the current time
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id,
            content: content.into(),
            is_encrypted: false,
            encryption_mode: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// First line, or [`UNTITLED`]
    pub fn title(&self) -> &str {
        match self.content.lines().next() {
            Some(line) if !line.is_empty() => line,
            _ => UNTITLED,
        }
    }

    /// Second line, truncated to [`SUMMARY_LEN`] characters
    pub fn summary(&self) -> String {
        self.content
            .lines()
            .nth(1)
            .map(|line| line.chars().take(SUMMARY_LEN).collect())
            .unwrap_or_default()
    }
}

/// A label. Names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Opaque ARGB value, never validated
    #[serde(default)]
    pub color: i32,
}

impl Label {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: 0,
        }
    }
}

/// Many-to-many link between a note and a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteLabelLink {
    pub note_id: i64,
    pub label_id: i64,
}

impl NoteLabelLink {
    pub fn new(note_id: i64, label_id: i64) -> Self {
        Self { note_id, label_id }
    }
}

/// ISO-8601 text form: `2024-05-01T09:30:00.000Z`
pub mod iso8601 {
    use chrono::{DateTime, Utc};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.format(FORMAT).to_string()
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_title_and_summary() {
        let note = Note::new(1, "Groceries\nmilk, eggs, bread\nthird line");
        assert_eq!(note.title(), "Groceries");
        assert_eq!(note.summary(), "milk, eggs, bread");

        let empty = Note::new(2, "");
        assert_eq!(empty.title(), UNTITLED);
        assert_eq!(empty.summary(), "");

        let blank_first = Note::new(3, "\nbody");
        assert_eq!(blank_first.title(), UNTITLED);
        assert_eq!(blank_first.summary(), "body");
    }

    #[test]
    fn test_summary_truncates_by_chars() {
        let long = "ż".repeat(80);
        let note = Note::new(1, format!("title\n{}", long));
        assert_eq!(note.summary().chars().count(), SUMMARY_LEN);
    }

    #[test]
    fn test_note_json_field_names() {
        let ts = Timestamp::from(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
        let note = Note {
            id: 7,
            content: "hello".into(),
            is_encrypted: false,
            encryption_mode: None,
            created_at: ts,
            modified_at: ts,
        };

        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["isEncrypted"], false);
        assert_eq!(json["createdAt"], "2024-05-01T09:30:00.000Z");
        assert!(json.get("encryptionMode").is_none());

        let link = serde_json::to_value(NoteLabelLink::new(7, 3)).unwrap();
        assert_eq!(link, serde_json::json!({"noteId": 7, "labelId": 3}));
    }

    #[test]
    fn test_note_reads_legacy_json() {
        let json = r#"{
            "id": 4,
            "content": "c2FsdA==:Ym9keQ==",
            "isEncrypted": true,
            "createdAt": "2023-01-02T03:04:05.678Z",
            "modifiedAt": "2023-01-02T03:04:05.678Z",
            "someFutureField": 1
        }"#;

        let note: Note = serde_json::from_str(json).unwrap();
        assert!(note.is_encrypted);
        assert_eq!(note.encryption_mode, None);
        assert_eq!(note.created_at.to_string(), "2023-01-02T03:04:05.678Z");
    }

    #[test]
    fn test_parse_truncates_to_millis() {
        let ts: Timestamp = serde_json::from_str(r#""2024-01-01T00:00:00.123456789+02:00""#).unwrap();
        assert_eq!(ts.to_string(), "2023-12-31T22:00:00.123Z");
    }

    #[test]
    fn test_raw_clock_value_survives_json() {
        let mut note = Note::new(1, "now");
        note.created_at = Utc::now().into();
        note.modified_at = Timestamp::from(Utc::now() + chrono::Duration::nanoseconds(999_999));

        let back: Note = serde_json::from_str(&serde_json::to_string(&note).unwrap()).unwrap();
        assert_eq!(back, note);
        assert_eq!(note.created_at.as_datetime().timestamp_subsec_nanos() % 1_000_000, 0);
    }
}
