//! Local calendar file persistence.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{SyncError, SyncResult};
use crate::event::EventCollection;

/// Reads and writes the event collection stored in a single JSON file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the file with an empty collection if it does not exist yet.
    /// Returns true if the file was created.
    pub fn ensure_exists(&self) -> SyncResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, "[]")?;
        Ok(true)
    }

    /// Load the collection in stored order.
    ///
    /// A missing file is an empty collection. A file that does not parse is a
    /// [`SyncError::LocalData`] and is never rewritten.
    pub fn load(&self) -> SyncResult<EventCollection> {
        if !self.path.exists() {
            return Ok(EventCollection::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        EventCollection::from_json(&content).map_err(|e| SyncError::LocalData {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Write the collection in normalized form.
    pub fn save(&self, events: &EventCollection) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, events.to_json())?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    pub fn modified_time(&self) -> SyncResult<DateTime<Utc>> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }
}
