use anyhow::Result;
use geekcal_core::{BackupManager, LocalStore, Settings};
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub fn list(settings: &Settings) -> Result<()> {
    let backups = BackupManager::new(settings.backup_dir()?);
    let entries = backups.list()?;

    if entries.is_empty() {
        println!("{}", format!("No backups in {}", backups.dir().display()).dimmed());
        return Ok(());
    }

    for entry in &entries {
        println!("{}", entry.render());
    }

    Ok(())
}

pub fn restore(settings: &Settings, name: &str, yes: bool) -> Result<()> {
    let backups = BackupManager::new(settings.backup_dir()?);
    let entry = backups.find(name)?;
    let calendar = settings.calendar_file()?;

    if !yes
        && !tui::confirm(&format!(
            "Overwrite {} with {}?",
            calendar.display(),
            entry.file_name
        ))?
    {
        println!("{}", "Restore cancelled".dimmed());
        return Ok(());
    }

    let store = LocalStore::new(&calendar);
    if store.exists() {
        let current = backups.snapshot(&calendar)?;
        println!("{}", format!("Current calendar saved as {}", current.file_name).dimmed());
    }

    backups.restore(&entry, &calendar)?;
    let events = store.load()?;
    println!("Restored {} ({} events)", entry.file_name, events.len());

    Ok(())
}
