//! Timestamped snapshots of the local calendar file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

const BACKUP_PREFIX: &str = "calendar_backup_";
const BACKUP_EXTENSION: &str = "json";

/// One snapshot in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub file_name: String,
    pub full_path: PathBuf,
    pub modified_time: DateTime<Utc>,
}

/// Copies the local calendar into a backup directory before each sync and
/// restores those copies on request. Backups are never deleted here.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        BackupManager { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the backup directory under a name derived from
    /// the current time.
    pub fn snapshot(&self, source: &Path) -> SyncResult<BackupEntry> {
        self.snapshot_at(source, Utc::now())
    }

    fn snapshot_at(&self, source: &Path, now: DateTime<Utc>) -> SyncResult<BackupEntry> {
        std::fs::create_dir_all(&self.dir)?;

        let stamp = backup_stamp(now);
        let mut file_name = format!("{BACKUP_PREFIX}{stamp}.{BACKUP_EXTENSION}");
        let mut n = 2;
        while self.dir.join(&file_name).exists() {
            file_name = format!("{BACKUP_PREFIX}{stamp}_{n}.{BACKUP_EXTENSION}");
            n += 1;
        }

        let full_path = self.dir.join(&file_name);
        std::fs::copy(source, &full_path)?;
        debug!(backup = %full_path.display(), "Snapshot written");

        let modified_time = DateTime::<Utc>::from(std::fs::metadata(&full_path)?.modified()?);
        Ok(BackupEntry {
            file_name,
            full_path,
            modified_time,
        })
    }

    /// All backups, most recently modified first. A missing backup directory
    /// means there are no backups.
    pub fn list(&self) -> SyncResult<Vec<BackupEntry>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups: Vec<BackupEntry> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?.to_string();
                if !is_backup_name(&file_name) {
                    return None;
                }
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some(BackupEntry {
                    file_name,
                    full_path: entry.path(),
                    modified_time: DateTime::<Utc>::from(modified),
                })
            })
            .collect();

        backups.sort_by(|a, b| {
            b.modified_time
                .cmp(&a.modified_time)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(backups)
    }

    /// Find a backup by file name.
    pub fn find(&self, file_name: &str) -> SyncResult<BackupEntry> {
        self.list()?
            .into_iter()
            .find(|b| b.file_name == file_name)
            .ok_or_else(|| {
                SyncError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("No backup named '{file_name}' in {}", self.dir.display()),
                ))
            })
    }

    /// Copy a backup over `destination`, overwriting it unconditionally.
    pub fn restore(&self, entry: &BackupEntry, destination: &Path) -> SyncResult<()> {
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&entry.full_path, destination)?;
        Ok(())
    }
}

/// ISO 8601 timestamp with everything but letters and digits removed,
/// e.g. `20240301T091500123Z`.
fn backup_stamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn is_backup_name(name: &str) -> bool {
    name.starts_with(BACKUP_PREFIX) && name.ends_with(&format!(".{BACKUP_EXTENSION}"))
}
