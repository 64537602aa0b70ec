//! Notes Vault - Backup Catalog
//!
//! Archive files in the app-local backup directory. A locator is the
//! archive's full path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::error::{VaultError, VaultResult};

/// File name prefix of catalog archives
pub const BACKUP_PREFIX: &str = "notes_backup_";

/// File extension of catalog archives
pub const BACKUP_EXTENSION: &str = "zip";

/// Timestamp embedded in archive names (local time)
pub const NAME_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Zero-fill chunk for secure delete
const WIPE_CHUNK: usize = 1024 * 1024;

/// Largest file accepted from outside the catalog (512 MiB)
const MAX_EXTERNAL_SIZE: u64 = 512 * 1024 * 1024;

/// A stored archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    /// File name, e.g. `notes_backup_20240310_121500.zip`
    pub name: String,
    /// Locator
    pub path: PathBuf,
    /// Timestamp from the name; `None` for foreign `.zip` files
    pub created_at: Option<NaiveDateTime>,
    pub size: u64,
}

impl BackupEntry {
    fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        let size = fs::metadata(&path).ok()?.len();
        let created_at = parse_name(&name).map(|(ts, _)| ts);

        Some(Self {
            name,
            path,
            created_at,
            size,
        })
    }

    fn sort_key(&self) -> (Option<(NaiveDateTime, u32)>, &str) {
        (parse_name(&self.name), &self.name)
    }
}

/// Split `notes_backup_<ts>[_N].zip` into timestamp and counter
pub fn parse_name(name: &str) -> Option<(NaiveDateTime, u32)> {
    let stem = name
        .strip_prefix(BACKUP_PREFIX)?
        .strip_suffix(BACKUP_EXTENSION)?
        .strip_suffix('.')?;

    // yyyyMMdd_HHmmss is 15 chars
    if stem.len() < 15 || !stem.is_char_boundary(15) {
        return None;
    }
    let (ts, rest) = stem.split_at(15);
    let ts = NaiveDateTime::parse_from_str(ts, NAME_TIME_FORMAT).ok()?;

    let counter = match rest {
        "" => 0,
        _ => rest.strip_prefix('_')?.parse().ok()?,
    };

    Some((ts, counter))
}

fn backup_name(ts: &NaiveDateTime, counter: u32) -> String {
    let stamp = ts.format(NAME_TIME_FORMAT);
    match counter {
        0 => format!("{}{}.{}", BACKUP_PREFIX, stamp, BACKUP_EXTENSION),
        n => format!("{}{}_{}.{}", BACKUP_PREFIX, stamp, n, BACKUP_EXTENSION),
    }
}

/// Backup directory manager
pub struct BackupCatalog {
    dir: PathBuf,
}

impl BackupCatalog {
    /// Catalog rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All archives, most recent first
    pub fn list(&self) -> VaultResult<Vec<BackupEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries: Vec<BackupEntry> = read_dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| p.extension().map(|ext| ext == BACKUP_EXTENSION).unwrap_or(false))
            .filter(|p| {
                !p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(true)
            })
            .filter_map(BackupEntry::from_path)
            .collect();

        // Some(..) > None, so timestamped archives come before foreign ones
        entries.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
        Ok(entries)
    }

    /// Store archive bytes under a fresh name. Never overwrites.
    pub fn save(&self, bytes: &[u8]) -> VaultResult<BackupEntry> {
        self.save_at(bytes, Local::now().naive_local())
    }

    fn save_at(&self, bytes: &[u8], now: NaiveDateTime) -> VaultResult<BackupEntry> {
        self.ensure_dir()?;

        // The archive is complete before any catalog name points at it
        let staging = staging_path(&self.dir.join(backup_name(&now, 0)));
        let published = write_synced(&staging, bytes).map_err(VaultError::from).and_then(|_| {
            let mut counter = 0;
            loop {
                let candidate = self.dir.join(backup_name(&now, counter));
                // hard_link never replaces; a taken name gets the next counter
                match fs::hard_link(&staging, &candidate) {
                    Ok(()) => return Ok(candidate),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                    Err(e) => return Err(e.into()),
                }
            }
        });
        let _ = fs::remove_file(&staging);
        let final_path = published?;

        log::info!("backup saved: {} ({} bytes)", final_path.display(), bytes.len());

        BackupEntry::from_path(final_path.clone())
            .ok_or_else(|| VaultError::BackupNotFound(final_path.display().to_string()))
    }

    /// Zero-overwrite then remove. `Ok(false)` if nothing was there.
    pub fn delete(&self, locator: &Path) -> VaultResult<bool> {
        let size = match fs::metadata(locator) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => return Err(VaultError::BackupNotFound(locator.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if size > 0 {
            if let Ok(mut file) = OpenOptions::new().write(true).open(locator) {
                let zeros = vec![0u8; (size as usize).min(WIPE_CHUNK)];
                let mut remaining = size as usize;
                while remaining > 0 {
                    let n = remaining.min(zeros.len());
                    if file.write_all(&zeros[..n]).is_err() {
                        break;
                    }
                    remaining -= n;
                }
                let _ = file.sync_all();
            }
        }

        match fs::remove_file(locator) {
            Ok(()) => {
                log::info!("backup deleted: {}", locator.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read an archive by locator
    pub fn open(&self, locator: &Path) -> VaultResult<Vec<u8>> {
        match fs::read(locator) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(VaultError::BackupNotFound(locator.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Locator for a bare archive name inside the catalog directory
    pub fn resolve(&self, name: &str) -> VaultResult<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(file)), None) => Ok(self.dir.join(file)),
            _ => Err(VaultError::BackupNotFound(name.to_string())),
        }
    }

    /// Read from a user-chosen location outside the catalog
    pub fn read_external(&self, path: &Path) -> VaultResult<Vec<u8>> {
        read_limited(path, MAX_EXTERNAL_SIZE)
    }

    /// Write to a user-chosen location outside the catalog (replaces it)
    pub fn write_external(&self, path: &Path, bytes: &[u8]) -> VaultResult<()> {
        let staging = staging_path(path);
        write_synced(&staging, bytes)?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete all but the `keep` most recent timestamped archives
    pub fn prune(&self, keep: usize) -> VaultResult<Vec<BackupEntry>> {
        self.prune_inner(keep, None)
    }

    /// Like [`prune`](Self::prune), but `retained` is never deleted and
    /// counts as one of the `keep` archives, whatever its name sorts as.
    pub fn prune_except(&self, keep: usize, retained: &Path) -> VaultResult<Vec<BackupEntry>> {
        self.prune_inner(keep, Some(retained))
    }

    fn prune_inner(&self, keep: usize, retained: Option<&Path>) -> VaultResult<Vec<BackupEntry>> {
        let mut removed = Vec::new();

        let (candidates, slots) = match retained {
            Some(path) => (
                self.list()?
                    .into_iter()
                    .filter(|e| e.path.as_path() != path)
                    .collect::<Vec<_>>(),
                keep.saturating_sub(1),
            ),
            None => (self.list()?, keep),
        };

        let stale = candidates
            .into_iter()
            .filter(|e| e.created_at.is_some())
            .skip(slots);

        for entry in stale {
            if self.delete(&entry.path)? {
                removed.push(entry);
            }
        }

        if !removed.is_empty() {
            log::info!("pruned {} old backup(s), kept {}", removed.len(), keep);
        }
        Ok(removed)
    }

    fn ensure_dir(&self) -> io::Result<()> {
        if self.dir.is_dir() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(&self.dir)
    }
}

/// Hidden sibling used while a file is being written
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.partial", name, std::process::id()))
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn read_limited(path: &Path, limit: u64) -> VaultResult<Vec<u8>> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    file.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Err(VaultError::InvalidArchiveFormat(format!(
            "{} exceeds {} bytes",
            path.display(),
            limit
        )));
    }
    Ok(bytes)
}
