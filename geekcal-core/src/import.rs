//! Importers for event files written by other terminal calendars.
//!
//! Both formats store 1-based months; imported events use the 0-based month
//! of [`Event`]. Lines that do not match the expected shape are skipped and
//! counted, never treated as an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::SyncResult;
use crate::event::Event;

/// `id,YYYY,M,D,"event text",...` with `""` as an escaped quote.
static CALCURE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\d+),(\d{4}),(\d{1,2}),(\d{1,2}),"((?:[^"]|"")+)""#)
        .expect("Invalid calcure regex")
});

/// `MM/DD/YYYY @ HH:MM -> MM/DD/YYYY @ HH:MM |event text`
static CALCURSE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2})/(\d{2})/(\d{4}) @ \d{2}:\d{2}.*\|(.+)").expect("Invalid calcurse regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Calcure's `events.csv`.
    Calcure,
    /// Calcurse's `apts` file.
    Calcurse,
}

impl ImportFormat {
    /// Where the other application keeps its events by default.
    pub fn default_path(self) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(match self {
            ImportFormat::Calcure => home.join(".config").join("calcure").join("events.csv"),
            ImportFormat::Calcurse => home
                .join(".local")
                .join("share")
                .join("calcurse")
                .join("apts"),
        })
    }

    pub fn parse(self, content: &str) -> Imported {
        match self {
            ImportFormat::Calcure => parse_calcure(content),
            ImportFormat::Calcurse => parse_calcurse(content),
        }
    }
}

impl fmt::Display for ImportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportFormat::Calcure => write!(f, "calcure"),
            ImportFormat::Calcurse => write!(f, "calcurse"),
        }
    }
}

/// Events read from a foreign file, in file order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Imported {
    pub events: Vec<Event>,
    /// Non-blank lines that could not be read as an event.
    pub skipped: usize,
}

/// Read and parse `path` in the given format.
pub fn import_file(format: ImportFormat, path: &Path) -> SyncResult<Imported> {
    let content = std::fs::read_to_string(path)?;
    let imported = format.parse(&content);
    debug!(
        %format,
        path = %path.display(),
        events = imported.events.len(),
        skipped = imported.skipped,
        "Parsed import file"
    );
    Ok(imported)
}

pub fn parse_calcure(content: &str) -> Imported {
    parse_lines(content, |line| {
        let caps = CALCURE_LINE.captures(line)?;
        let year = caps[2].parse().ok()?;
        let month = zero_based(&caps[3])?;
        let day = caps[4].parse().ok()?;
        let text = caps[5].replace("\"\"", "\"");
        Some(Event::new(year, month, day, text))
    })
}

pub fn parse_calcurse(content: &str) -> Imported {
    parse_lines(content, |line| {
        let caps = CALCURSE_LINE.captures(line)?;
        let month = zero_based(&caps[1])?;
        let day = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        let text = caps[4].trim();
        if text.is_empty() {
            return None;
        }
        Some(Event::new(year, month, day, text))
    })
}

fn parse_lines(content: &str, parse: impl Fn(&str) -> Option<Event>) -> Imported {
    let mut imported = Imported::default();
    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        match parse(line) {
            Some(event) => imported.events.push(event),
            None => imported.skipped += 1,
        }
    }
    imported
}

fn zero_based(month: &str) -> Option<u32> {
    month.parse::<u32>().ok()?.checked_sub(1)
}
