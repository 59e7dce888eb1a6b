use anyhow::Result;
use geekcal_core::Settings;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(settings: &Settings) -> Result<()> {
    let engine = super::engine(settings)?;
    let calendar = settings.calendar_file()?;

    let spinner = tui::create_spinner("Checking remote".to_string());
    let result = engine.plan(&calendar).await;
    spinner.finish_and_clear();
    let plan = result?;

    println!("{}", plan.render());

    let recent = engine.recent_revisions();
    if !recent.is_empty() {
        println!("   {}", "Recently synced revisions:".dimmed());
        for id in recent {
            println!("     {}", short_id(&id).dimmed());
        }
    }

    Ok(())
}

pub fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}
