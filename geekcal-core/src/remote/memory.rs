//! In-memory remote store for exercising the sync engine.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::{SyncError, SyncResult};
use crate::remote::{HistoryEntry, RemoteFile, RemoteRevision, RemoteStore};

#[derive(Clone)]
struct Commit {
    id: String,
    hash: String,
    content: String,
    time: DateTime<Utc>,
    message: String,
}

struct State {
    /// Oldest first, per path.
    files: HashMap<String, Vec<Commit>>,
    next_commit: u64,
    clock: DateTime<Utc>,
    concurrent_writes: VecDeque<String>,
    fetch_failures: VecDeque<SyncError>,
    update_failures: VecDeque<SyncError>,
    update_attempts: usize,
    expected_hashes: Vec<Option<String>>,
}

pub(crate) struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        MemoryRemote {
            state: Mutex::new(State {
                files: HashMap::new(),
                next_commit: 1,
                clock: Utc::now(),
                concurrent_writes: VecDeque::new(),
                fetch_failures: VecDeque::new(),
                update_failures: VecDeque::new(),
                update_attempts: 0,
                expected_hashes: Vec::new(),
            }),
        }
    }

    /// Seed `path` with a commit at `time`.
    pub fn with_file(self, path: &str, content: &str, time: DateTime<Utc>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let previous = state.clock;
            state.clock = time;
            state.commit(path, content, "seed");
            state.clock = previous;
        }
        self
    }

    /// Time stamped on commits made from now on.
    pub fn set_clock(&self, time: DateTime<Utc>) {
        self.state.lock().unwrap().clock = time;
    }

    /// Simulate another writer: the next `update_content` call first sees
    /// `content` committed by someone else.
    pub fn inject_concurrent_write(&self, content: &str) {
        self.state
            .lock()
            .unwrap()
            .concurrent_writes
            .push_back(content.to_string());
    }

    /// The next `fetch_current` call fails with `error`.
    pub fn fail_next_fetch(&self, error: SyncError) {
        self.state.lock().unwrap().fetch_failures.push_back(error);
    }

    /// The next `update_content` call fails with `error` without writing.
    pub fn fail_next_update(&self, error: SyncError) {
        self.state.lock().unwrap().update_failures.push_back(error);
    }

    pub fn content(&self, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.latest(path).map(|c| c.content.clone())
    }

    pub fn latest_revision_id(&self, path: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state.latest(path).map(|c| c.id.clone())
    }

    pub fn update_attempts(&self) -> usize {
        self.state.lock().unwrap().update_attempts
    }

    /// The `expected_hash` passed to each `update_content` call, in order.
    pub fn expected_hashes(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().expected_hashes.clone()
    }
}

impl State {
    fn latest(&self, path: &str) -> Option<&Commit> {
        self.files.get(path).and_then(|commits| commits.last())
    }

    fn commit(&mut self, path: &str, content: &str, message: &str) -> String {
        let id = format!("commit-{}", self.next_commit);
        self.next_commit += 1;
        let commit = Commit {
            id: id.clone(),
            hash: blob_hash(content),
            content: content.to_string(),
            time: self.clock,
            message: message.to_string(),
        };
        self.files.entry(path.to_string()).or_default().push(commit);
        id
    }
}

fn blob_hash(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

impl RemoteStore for MemoryRemote {
    async fn fetch_current(&self, path: &str) -> SyncResult<Option<RemoteFile>> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fetch_failures.pop_front() {
            return Err(error);
        }
        Ok(state.latest(path).map(|c| RemoteFile {
            revision: RemoteRevision {
                content_hash: c.hash.clone(),
                last_change_time: Some(c.time),
                revision_id: Some(c.id.clone()),
            },
            content: c.content.clone(),
        }))
    }

    async fn fetch_history(&self, path: &str, limit: usize) -> SyncResult<Vec<HistoryEntry>> {
        let state = self.state.lock().unwrap();
        let commits = state.files.get(path).cloned().unwrap_or_default();
        Ok(commits
            .into_iter()
            .rev()
            .take(limit)
            .map(|c| HistoryEntry {
                revision_id: c.id,
                timestamp: c.time,
                message: c.message,
            })
            .collect())
    }

    async fn fetch_at_revision(&self, path: &str, revision_id: &str) -> SyncResult<String> {
        let state = self.state.lock().unwrap();
        state
            .files
            .get(path)
            .and_then(|commits| commits.iter().find(|c| c.id == revision_id))
            .map(|c| c.content.clone())
            .ok_or_else(|| SyncError::RemoteData(format!("no file at revision {revision_id}")))
    }

    async fn update_content(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_hash: Option<&str>,
    ) -> SyncResult<String> {
        let mut state = self.state.lock().unwrap();
        state.update_attempts += 1;
        state.expected_hashes.push(expected_hash.map(str::to_string));
        if let Some(error) = state.update_failures.pop_front() {
            return Err(error);
        }

        if let Some(other) = state.concurrent_writes.pop_front() {
            state.commit(path, &other, "concurrent edit");
        }

        let current_hash = state.latest(path).map(|c| c.hash.as_str());
        if current_hash != expected_hash {
            return Err(SyncError::ConcurrencyConflict);
        }

        Ok(state.commit(path, content, message))
    }
}
