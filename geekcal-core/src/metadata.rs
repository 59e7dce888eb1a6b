//! Advisory record of recently seen remote revisions.
//!
//! The metadata is history only: it is never consulted when deciding a sync
//! direction, so a missing or corrupt file simply starts a fresh record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SyncResult;

/// Number of revision ids kept per remote.
pub const HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteHistory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteHistory {
    /// Most recent first.
    pub history: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl SyncMetadata {
    /// Prepend `revision_id` unless it is already the most recent entry, and
    /// keep at most [`HISTORY_LIMIT`] ids.
    pub fn record_revision(&mut self, remote_key: &str, revision_id: &str) {
        let now = Utc::now();
        let entry = self
            .remotes
            .entry(remote_key.to_string())
            .or_insert_with(|| RemoteHistory {
                history: Vec::new(),
                updated_at: now,
            });

        if entry.history.first().map(String::as_str) != Some(revision_id) {
            entry.history.insert(0, revision_id.to_string());
        }
        entry.history.truncate(HISTORY_LIMIT);
        entry.updated_at = now;
    }

    pub fn history(&self, remote_key: &str) -> &[String] {
        self.remotes
            .get(remote_key)
            .map(|r| r.history.as_slice())
            .unwrap_or_default()
    }
}

/// Reads and writes [`SyncMetadata`] as a JSON file.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        MetadataStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> SyncMetadata {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SyncMetadata::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read sync metadata, starting fresh");
                return SyncMetadata::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Corrupt sync metadata, starting fresh");
            SyncMetadata::default()
        })
    }

    pub fn save(&self, metadata: &SyncMetadata) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(metadata)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Load, record one revision and save.
    pub fn record_revision(&self, remote_key: &str, revision_id: &str) -> SyncResult<()> {
        let mut metadata = self.load();
        metadata.record_revision(remote_key, revision_id);
        self.save(&metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const KEY: &str = "alice/calendar:calendar.json";

    #[test]
    fn history_keeps_five_most_recent_first() {
        let mut metadata = SyncMetadata::default();
        for id in ["r1", "r2", "r3", "r4", "r5", "r6"] {
            metadata.record_revision(KEY, id);
        }
        assert_eq!(metadata.history(KEY), ["r6", "r5", "r4", "r3", "r2"]);
    }

    #[test]
    fn repeated_head_is_not_duplicated() {
        let mut metadata = SyncMetadata::default();
        metadata.record_revision(KEY, "r1");
        metadata.record_revision(KEY, "r1");
        metadata.record_revision(KEY, "r2");
        metadata.record_revision(KEY, "r1");
        assert_eq!(metadata.history(KEY), ["r1", "r2", "r1"]);
    }

    #[test]
    fn unknown_remote_has_empty_history() {
        assert!(SyncMetadata::default().history(KEY).is_empty());
    }

    #[test]
    fn missing_or_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("sync_metadata.json"));
        assert_eq!(store.load(), SyncMetadata::default());

        std::fs::write(store.path(), "not json").unwrap();
        assert_eq!(store.load(), SyncMetadata::default());
    }

    #[test]
    fn save_uses_documented_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path().join("meta/sync_metadata.json"));
        store.record_revision(KEY, "abc123").unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["remotes"][KEY]["history"][0], "abc123");
        assert!(raw["remotes"][KEY]["updatedAt"].is_string());
        assert_eq!(store.load().history(KEY), ["abc123"]);
    }
}
