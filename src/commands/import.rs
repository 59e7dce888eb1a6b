use std::path::PathBuf;

use anyhow::{Context, Result};
use geekcal_core::import::import_file;
use geekcal_core::{ImportFormat, LocalStore, Settings};
use owo_colors::OwoColorize;

/// Append events from another calendar's file to the local calendar.
pub fn run(settings: &Settings, format: ImportFormat, file: Option<PathBuf>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => format
            .default_path()
            .context("Could not determine home directory, pass the file explicitly")?,
    };

    let imported = import_file(format, &path)
        .with_context(|| format!("Failed to import from {format} ({})", path.display()))?;

    let store = LocalStore::new(settings.calendar_file()?);
    let mut events = store.load()?;
    let count = imported.events.len();
    for event in imported.events {
        events.add(event);
    }
    store.save(&events)?;

    println!(
        "{} Imported {} events from {} ({})",
        "+".green(),
        count,
        format,
        path.display()
    );
    if imported.skipped > 0 {
        println!(
            "{}",
            format!("Skipped {} unreadable lines", imported.skipped).dimmed()
        );
    }

    Ok(())
}
