//! Terminal rendering for geekcal-core types.

use chrono::Local;
use geekcal_core::{BackupEntry, Event, HistoryEntry, SyncOutcome, SyncPlan};
use owo_colors::OwoColorize;

use crate::commands::status::short_id;

/// Extension trait for colored terminal output.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Event {
    fn render(&self) -> String {
        let date = format!("{:04}-{:02}-{:02}", self.year, self.month + 1, self.day);
        format!("{} {}", date.dimmed(), self.text)
    }
}

impl Render for SyncOutcome {
    fn render(&self) -> String {
        match self {
            SyncOutcome::Pushed => format!("{} Pushed local changes", "↑".green()),
            SyncOutcome::Pulled => format!("{} Pulled remote changes", "↓".yellow()),
            SyncOutcome::NoOpAlreadyEqual => format!("{} Already in sync", "=".dimmed()),
            SyncOutcome::InitializedRemote => format!("{} Created remote calendar", "+".green()),
        }
    }
}

impl Render for SyncPlan {
    fn render(&self) -> String {
        let local_time = self
            .local_time
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "missing".to_string());

        let remote = match (&self.remote_revision, self.remote_events) {
            (Some(revision), Some(count)) => {
                let changed = revision
                    .last_change_time
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let id = revision.revision_id.as_deref().map(short_id).unwrap_or("-");
                format!("{} events, changed {} ({})", count, changed, id)
            }
            _ => "does not exist".to_string(),
        };

        let next = match self.outcome {
            SyncOutcome::Pushed => "push local changes".green().to_string(),
            SyncOutcome::Pulled => "pull remote changes".yellow().to_string(),
            SyncOutcome::NoOpAlreadyEqual => "nothing to do".dimmed().to_string(),
            SyncOutcome::InitializedRemote => "create remote calendar".green().to_string(),
        };

        [
            format!("   {} {} events, modified {}", "Local: ".dimmed(), self.local_events, local_time),
            format!("   {} {}", "Remote:".dimmed(), remote),
            format!("   {} {}", "Sync:  ".dimmed(), next),
        ]
        .join("\n")
    }
}

impl Render for BackupEntry {
    fn render(&self) -> String {
        let when = self
            .modified_time
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S");
        format!("{} {}", when.to_string().dimmed(), self.file_name)
    }
}

impl Render for HistoryEntry {
    fn render(&self) -> String {
        let when = self.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M");
        let message = self.message.lines().next().unwrap_or_default();
        format!(
            "{} {} {}",
            short_id(&self.revision_id).yellow(),
            when.to_string().dimmed(),
            message
        )
    }
}
