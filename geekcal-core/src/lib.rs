//! Sync and recovery engine for geekcal.
//!
//! Keeps a local calendar file consistent with a single remote copy stored in
//! a GitHub repository:
//! - `event`: event records and the normalized collection compared between replicas
//! - `local` / `backup`: the local file and its timestamped snapshots
//! - `remote`: the `RemoteStore` seam and the GitHub contents API client
//! - `engine`: push/pull/no-op decisions with a single conflict retry
//! - `metadata`: advisory history of recently seen remote revisions
//! - `import`: readers for Calcure and Calcurse event files

pub mod backup;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod import;
pub mod local;
pub mod metadata;
pub mod remote;

pub use backup::{BackupEntry, BackupManager};
pub use config::{RemoteConfig, Settings};
pub use engine::{SyncEngine, SyncOutcome, SyncPlan};
pub use error::{SyncError, SyncErrorKind, SyncResult};
pub use event::{Event, EventCollection};
pub use import::{ImportFormat, Imported};
pub use local::LocalStore;
pub use metadata::{MetadataStore, SyncMetadata};
pub use remote::github::GitHubClient;
pub use remote::{HistoryEntry, RemoteFile, RemoteRevision, RemoteStore};
