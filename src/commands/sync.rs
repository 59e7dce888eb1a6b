use anyhow::Result;
use geekcal_core::Settings;
use geekcal_core::config::TOKEN_ENV;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(settings: &Settings) -> Result<()> {
    let engine = super::engine(settings)?;
    let calendar = settings.calendar_file()?;

    let spinner = tui::create_spinner("Syncing".to_string());
    let result = engine.sync(&calendar).await;
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => {
            println!("{}", outcome.render());
            Ok(())
        }
        Err(e) => {
            println!("{}", "Sync failed".red());
            if e.is_authorization() {
                println!(
                    "{}",
                    format!(
                        "Check github.token in your config or set {TOKEN_ENV}; the token needs contents read/write access"
                    )
                    .dimmed()
                );
            }
            Err(e.into())
        }
    }
}
