//! Error types for geekcal sync and recovery.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while syncing, backing up or restoring a calendar.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Local calendar at {} is not a valid event list: {message}", .path.display())]
    LocalData { path: PathBuf, message: String },

    #[error("Remote calendar content is invalid: {0}")]
    RemoteData(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0} (check your GitHub token)")]
    Unauthorized(String),

    #[error("Forbidden: {0} (access denied or rate-limited, try again later)")]
    Forbidden(String),

    #[error("Remote content changed since it was fetched")]
    ConcurrencyConflict,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`SyncError`], for callers that branch on the
/// failure category rather than on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    Configuration,
    LocalData,
    RemoteData,
    Network,
    Unauthorized,
    Forbidden,
    ConcurrencyConflict,
    Io,
}

impl SyncError {
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Config(_) => SyncErrorKind::Configuration,
            SyncError::LocalData { .. } => SyncErrorKind::LocalData,
            SyncError::RemoteData(_) => SyncErrorKind::RemoteData,
            SyncError::Network(_) => SyncErrorKind::Network,
            SyncError::Unauthorized(_) => SyncErrorKind::Unauthorized,
            SyncError::Forbidden(_) => SyncErrorKind::Forbidden,
            SyncError::ConcurrencyConflict => SyncErrorKind::ConcurrencyConflict,
            SyncError::Io(_) => SyncErrorKind::Io,
        }
    }

    /// Authorization failures are never retried.
    pub fn is_authorization(&self) -> bool {
        matches!(self, SyncError::Unauthorized(_) | SyncError::Forbidden(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SyncError::Network(format!("request timed out: {e}"))
        } else {
            SyncError::Network(e.to_string())
        }
    }
}

/// Result type alias for geekcal operations.
pub type SyncResult<T> = Result<T, SyncError>;
