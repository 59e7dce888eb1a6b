pub mod backups;
pub mod events;
pub mod history;
pub mod import;
pub mod status;
pub mod sync;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use geekcal_core::{BackupManager, GitHubClient, MetadataStore, Settings, SyncEngine};

/// Build a sync engine for the configured GitHub remote.
///
/// Fails with a configuration error before any network call if the remote
/// settings are incomplete.
pub fn engine(settings: &Settings) -> Result<SyncEngine<GitHubClient>> {
    let remote = settings.remote()?;
    let client = GitHubClient::new(&remote)?;

    Ok(SyncEngine::new(
        client,
        remote.path.clone(),
        remote.key(),
        BackupManager::new(settings.backup_dir()?),
        MetadataStore::new(settings.metadata_file()?),
    ))
}

/// Parse `YYYY-MM-DD` into (year, 0-based month, day).
pub fn parse_day(date: &str) -> Result<(i32, u32, u32)> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{date}', expected YYYY-MM-DD"))?;
    Ok((date.year(), date.month0(), date.day()))
}

/// Parse `YYYY-MM` into (year, 0-based month).
pub fn parse_month(date: &str) -> Result<(i32, u32)> {
    let date = NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{date}', expected YYYY-MM"))?;
    Ok((date.year(), date.month0()))
}
