//! Conflict resolution between the local calendar file and its remote copy.
//!
//! One `sync` call runs to completion sequentially: snapshot, load local,
//! fetch remote, decide, act, record. Network calls are issued one at a
//! time. Resolution is whole-file: whichever replica wins replaces the
//! other.

use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::backup::BackupManager;
use crate::error::{SyncError, SyncResult};
use crate::event::EventCollection;
use crate::local::LocalStore;
use crate::metadata::MetadataStore;
use crate::remote::{HistoryEntry, RemoteRevision, RemoteStore};

/// What a successful sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Local content was written to the remote.
    Pushed,
    /// Remote content was written to the local file.
    Pulled,
    /// Both replicas already held the same events.
    NoOpAlreadyEqual,
    /// The remote file did not exist and was created from local content.
    InitializedRemote,
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Pushed => write!(f, "pushed local changes"),
            SyncOutcome::Pulled => write!(f, "pulled remote changes"),
            SyncOutcome::NoOpAlreadyEqual => write!(f, "already in sync"),
            SyncOutcome::InitializedRemote => write!(f, "created remote calendar"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushReason {
    /// Remote path does not exist yet.
    Initial,
    /// Remote exists but holds no events.
    RemoteEmpty,
    LocalNewer,
    /// Timestamps equal or remote time unknown.
    Tie,
}

impl PushReason {
    fn commit_message(self) -> &'static str {
        match self {
            PushReason::Initial => "Initial calendar data",
            PushReason::RemoteEmpty => "Sync calendar data: Remote was empty",
            PushReason::LocalNewer => "Sync calendar data: Local is newer",
            PushReason::Tie => "Sync calendar data: Content differs, local prioritized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Push(PushReason),
    Pull,
    AlreadyEqual,
}

impl Decision {
    fn outcome(self) -> SyncOutcome {
        match self {
            Decision::Push(PushReason::Initial) => SyncOutcome::InitializedRemote,
            Decision::Push(_) => SyncOutcome::Pushed,
            Decision::Pull => SyncOutcome::Pulled,
            Decision::AlreadyEqual => SyncOutcome::NoOpAlreadyEqual,
        }
    }
}

/// The remote side as seen by [`decide`].
struct RemoteState {
    revision: RemoteRevision,
    events: EventCollection,
}

/// Pick the sync direction. Emptiness is checked before any timestamp so
/// that a truncated replica never overwrites a populated one.
fn decide(
    local: &EventCollection,
    local_time: DateTime<Utc>,
    remote: Option<&RemoteState>,
) -> Decision {
    let remote_empty = remote.is_none_or(|r| r.events.is_empty());

    if local.is_empty() && !remote_empty {
        return Decision::Pull;
    }
    if remote_empty && !local.is_empty() {
        return match remote {
            None => Decision::Push(PushReason::Initial),
            Some(_) => Decision::Push(PushReason::RemoteEmpty),
        };
    }

    let Some(remote) = remote else {
        return Decision::Push(PushReason::Initial);
    };

    if local.normalized_eq(&remote.events) {
        return Decision::AlreadyEqual;
    }

    match remote.revision.last_change_time {
        Some(remote_time) if local_time > remote_time => Decision::Push(PushReason::LocalNewer),
        Some(remote_time) if local_time < remote_time => Decision::Pull,
        _ => Decision::Push(PushReason::Tie),
    }
}

/// Read-only preview of what `sync` would do.
#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub local_events: usize,
    pub local_time: Option<DateTime<Utc>>,
    pub remote_events: Option<usize>,
    pub remote_revision: Option<RemoteRevision>,
    pub outcome: SyncOutcome,
}

/// Orchestrates backups, the remote store, the local file and the sync
/// metadata. It is the only component that decides which replica wins.
pub struct SyncEngine<R> {
    remote: R,
    remote_path: String,
    remote_key: String,
    backups: BackupManager,
    metadata: MetadataStore,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(
        remote: R,
        remote_path: impl Into<String>,
        remote_key: impl Into<String>,
        backups: BackupManager,
        metadata: MetadataStore,
    ) -> Self {
        SyncEngine {
            remote,
            remote_path: remote_path.into(),
            remote_key: remote_key.into(),
            backups,
            metadata,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    /// Reconcile the local file at `local_path` with the remote copy.
    pub async fn sync(&self, local_path: &Path) -> SyncResult<SyncOutcome> {
        let local = LocalStore::new(local_path);
        if local.ensure_exists()? {
            info!(path = %local_path.display(), "Created empty local calendar");
        }

        self.snapshot(&local);

        let local_events = local.load()?;
        let local_time = local.modified_time()?;
        let remote = self.fetch_remote().await?;

        let decision = decide(&local_events, local_time, remote.as_ref());
        info!(
            ?decision,
            local_events = local_events.len(),
            remote_events = ?remote.as_ref().map(|r| r.events.len()),
            %local_time,
            remote_time = ?remote.as_ref().and_then(|r| r.revision.last_change_time),
            "Sync decision"
        );

        match decision {
            Decision::Pull => {
                // `Pull` is only decided when a remote exists.
                let remote = remote.ok_or_else(|| {
                    SyncError::RemoteData("remote disappeared during sync".into())
                })?;
                local.save(&remote.events)?;
                self.record_revision(remote.revision.revision_id.as_deref());
            }
            Decision::AlreadyEqual => {
                let normalized = local_events.to_json();
                if std::fs::read_to_string(local.path())? != normalized {
                    local.save(&local_events)?;
                }
                let revision_id = remote.as_ref().and_then(|r| r.revision.revision_id.as_deref());
                self.record_revision(revision_id);
            }
            Decision::Push(reason) => {
                let expected_hash = remote.as_ref().map(|r| r.revision.content_hash.as_str());
                let revision_id = self
                    .push_with_retry(&local_events, reason.commit_message(), expected_hash)
                    .await?;
                local.save(&local_events)?;
                self.record_revision(revision_id.as_deref());
            }
        }

        let outcome = decision.outcome();
        info!(%outcome, "Sync finished");
        Ok(outcome)
    }

    /// Compute what `sync` would do without writing anything.
    pub async fn plan(&self, local_path: &Path) -> SyncResult<SyncPlan> {
        let local = LocalStore::new(local_path);
        let local_events = local.load()?;
        let local_time = if local.exists() {
            Some(local.modified_time()?)
        } else {
            None
        };
        let remote = self.fetch_remote().await?;

        let decision = decide(
            &local_events,
            local_time.unwrap_or(DateTime::<Utc>::MIN_UTC),
            remote.as_ref(),
        );

        Ok(SyncPlan {
            local_events: local_events.len(),
            local_time,
            remote_events: remote.as_ref().map(|r| r.events.len()),
            remote_revision: remote.map(|r| r.revision),
            outcome: decision.outcome(),
        })
    }

    /// Remote revisions of the calendar file, most recent first.
    pub async fn history(&self, limit: usize) -> SyncResult<Vec<HistoryEntry>> {
        self.remote.fetch_history(&self.remote_path, limit).await
    }

    /// Revision ids recorded by previous syncs, most recent first.
    pub fn recent_revisions(&self) -> Vec<String> {
        self.metadata.load().history(&self.remote_key).to_vec()
    }

    /// Replace the local file with the remote content at `revision_id`.
    ///
    /// The current local file is snapshotted first; unlike during sync, a
    /// failed snapshot aborts the restore. The next sync pushes the restored
    /// events since the local file is then the newer replica.
    pub async fn restore_revision(
        &self,
        local_path: &Path,
        revision_id: &str,
    ) -> SyncResult<EventCollection> {
        let content = self
            .remote
            .fetch_at_revision(&self.remote_path, revision_id)
            .await?;
        let events = parse_remote(&content)?;

        let local = LocalStore::new(local_path);
        if local.exists() {
            let entry = self.backups.snapshot(local.path())?;
            debug!(backup = %entry.full_path.display(), "Snapshot before restore");
        }
        local.save(&events)?;

        info!(revision_id, events = events.len(), "Restored remote revision locally");
        Ok(events)
    }

    fn snapshot(&self, local: &LocalStore) {
        match self.backups.snapshot(local.path()) {
            Ok(entry) => debug!(backup = %entry.full_path.display(), "Snapshot before sync"),
            Err(e) => warn!(error = %e, "Backup failed, continuing sync without snapshot"),
        }
    }

    async fn fetch_remote(&self) -> SyncResult<Option<RemoteState>> {
        let Some(file) = self.remote.fetch_current(&self.remote_path).await? else {
            return Ok(None);
        };
        let events = parse_remote(&file.content)?;
        Ok(Some(RemoteState {
            revision: file.revision,
            events,
        }))
    }

    /// Write `events` to the remote, retrying once on a stale hash.
    ///
    /// After a conflict the remote is re-read: if it already holds the same
    /// events the push counts as done, otherwise one more update is tried
    /// with the fresh hash. A second conflict is reported as a failure.
    async fn push_with_retry(
        &self,
        events: &EventCollection,
        message: &str,
        expected_hash: Option<&str>,
    ) -> SyncResult<Option<String>> {
        let content = events.to_json();

        match self
            .remote
            .update_content(&self.remote_path, &content, message, expected_hash)
            .await
        {
            Ok(revision_id) => return Ok(Some(revision_id)),
            Err(SyncError::ConcurrencyConflict) => {
                warn!(path = %self.remote_path, "Remote changed since fetch, re-reading");
            }
            Err(e) => return Err(e),
        }

        let current = self.remote.fetch_current(&self.remote_path).await?;
        let fresh_hash = match &current {
            Some(file) => {
                if parse_remote(&file.content)?.normalized_eq(events) {
                    info!("Remote already holds the pushed events");
                    return Ok(file.revision.revision_id.clone());
                }
                Some(file.revision.content_hash.as_str())
            }
            None => None,
        };

        match self
            .remote
            .update_content(&self.remote_path, &content, message, fresh_hash)
            .await
        {
            Ok(revision_id) => Ok(Some(revision_id)),
            Err(SyncError::ConcurrencyConflict) => Err(SyncError::Network(format!(
                "'{}' changed again while retrying the update; re-run sync once the other writer is done",
                self.remote_path
            ))),
            Err(e) => Err(e),
        }
    }

    fn record_revision(&self, revision_id: Option<&str>) {
        let Some(revision_id) = revision_id else {
            return;
        };
        if let Err(e) = self.metadata.record_revision(&self.remote_key, revision_id) {
            warn!(error = %e, "Could not record sync metadata");
        }
    }
}

fn parse_remote(content: &str) -> SyncResult<EventCollection> {
    EventCollection::from_json(content).map_err(|e| SyncError::RemoteData(e.to_string()))
}
