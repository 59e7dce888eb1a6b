//! Remote copy of the calendar, stored as a file in a versioned repository.

pub mod github;
#[cfg(test)]
pub(crate) mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// State of the remote file at its latest revision.
///
/// `content_hash` and `revision_id` are deliberately separate: the hash
/// authorizes the next update (optimistic concurrency token), the revision
/// id addresses a point in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRevision {
    pub content_hash: String,
    /// `None` when the store has no history for the path.
    pub last_change_time: Option<DateTime<Utc>>,
    pub revision_id: Option<String>,
}

/// The remote file's raw content and the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub revision: RemoteRevision,
    pub content: String,
}

/// One entry in the remote file's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub revision_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Content/version API the sync engine talks to.
///
/// Implementations are pure I/O: they never decide which replica wins.
/// Calls are issued one at a time by the engine.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Current content and revision, or `None` if the path does not exist.
    async fn fetch_current(&self, path: &str) -> SyncResult<Option<RemoteFile>>;

    /// Up to `limit` revisions that touched `path`, most recent first.
    async fn fetch_history(&self, path: &str, limit: usize) -> SyncResult<Vec<HistoryEntry>>;

    /// Content of `path` at `revision_id`. Fails with
    /// [`SyncError::RemoteData`](crate::SyncError::RemoteData) if the path is
    /// not a plain file at that revision.
    async fn fetch_at_revision(&self, path: &str, revision_id: &str) -> SyncResult<String>;

    /// Create or update `path`. With `expected_hash` the store only accepts
    /// the write if its current hash matches, otherwise it returns
    /// [`SyncError::ConcurrencyConflict`](crate::SyncError::ConcurrencyConflict).
    /// Returns the new revision id.
    async fn update_content(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_hash: Option<&str>,
    ) -> SyncResult<String>;
}
