use anyhow::Result;
use geekcal_core::Settings;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(settings: &Settings, limit: usize) -> Result<()> {
    let engine = super::engine(settings)?;

    let spinner = tui::create_spinner("Fetching history".to_string());
    let result = engine.history(limit).await;
    spinner.finish_and_clear();
    let history = result?;

    if history.is_empty() {
        println!("{}", "No remote revisions".dimmed());
    }
    for entry in &history {
        println!("{}", entry.render());
    }

    Ok(())
}

pub async fn restore(settings: &Settings, revision: &str, yes: bool) -> Result<()> {
    let engine = super::engine(settings)?;
    let calendar = settings.calendar_file()?;

    if !yes
        && !tui::confirm(&format!(
            "Overwrite {} with remote revision {}?",
            calendar.display(),
            revision
        ))?
    {
        println!("{}", "Restore cancelled".dimmed());
        return Ok(());
    }

    let spinner = tui::create_spinner(format!("Fetching revision {revision}"));
    let result = engine.restore_revision(&calendar, revision).await;
    spinner.finish_and_clear();
    let events = result?;

    println!("Restored revision {} ({} events)", revision, events.len());
    println!("{}", "Run `geekcal sync` to publish it to the remote.".dimmed());

    Ok(())
}
