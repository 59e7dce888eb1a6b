use anyhow::Result;
use geekcal_core::{Event, LocalStore, Settings};
use owo_colors::OwoColorize;

use super::{parse_day, parse_month};
use crate::render::Render;

pub fn add(settings: &Settings, date: &str, text: String) -> Result<()> {
    let (year, month, day) = parse_day(date)?;
    let store = LocalStore::new(settings.calendar_file()?);

    let mut events = store.load()?;
    let event = Event::new(year, month, day, text);
    println!("{} {}", "+".green(), event.render());
    events.add(event);
    store.save(&events)?;

    Ok(())
}

pub fn list(settings: &Settings, date: Option<&str>) -> Result<()> {
    let store = LocalStore::new(settings.calendar_file()?);
    let events = store.load()?.normalized();

    let selected: Vec<&Event> = match date {
        None => events.events().iter().collect(),
        Some(date) if date.len() > 7 => {
            let (year, month, day) = parse_day(date)?;
            events.events_on(year, month, day)
        }
        Some(date) => {
            let (year, month) = parse_month(date)?;
            let days = events.days_with_events(year, month);
            if !days.is_empty() {
                let days: Vec<String> = days.iter().map(u32::to_string).collect();
                println!("{} {}", "Days:".dimmed(), days.join(", "));
            }
            events
                .events()
                .iter()
                .filter(|e| e.year == year && e.month == month)
                .collect()
        }
    };

    if selected.is_empty() {
        println!("{}", "No events".dimmed());
    }
    for event in selected {
        println!("{}", event.render());
    }

    Ok(())
}

pub fn delete(settings: &Settings, date: &str, index: usize) -> Result<()> {
    let (year, month, day) = parse_day(date)?;
    let store = LocalStore::new(settings.calendar_file()?);

    let mut events = store.load()?;
    let removed = index
        .checked_sub(1)
        .and_then(|i| events.delete_on(year, month, day, i));

    match removed {
        Some(event) => {
            store.save(&events)?;
            println!("{} {}", "-".red(), event.render());
            Ok(())
        }
        None => anyhow::bail!(
            "No event #{} on {} ({} on that day)",
            index,
            date,
            events.events_on(year, month, day).len()
        ),
    }
}
