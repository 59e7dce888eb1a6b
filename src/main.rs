mod commands;
mod render;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use geekcal_core::{ImportFormat, Settings};
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter, e.g. `geekcal_core=debug`.
const LOG_ENV: &str = "GEEKCAL_LOG";

#[derive(Parser)]
#[command(name = "geekcal")]
#[command(about = "Keep your calendar in sync with a file in a GitHub repository")]
struct Cli {
    /// Log sync decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the local calendar with the remote copy
    Sync,
    /// Show what a sync would do, without changing anything
    Status,
    /// Add an event to the local calendar
    Add {
        /// Date as YYYY-MM-DD
        date: String,
        text: String,
    },
    /// List local events, optionally for one month (YYYY-MM) or day (YYYY-MM-DD)
    List { date: Option<String> },
    /// Delete the n-th event (starting at 1) on a day
    Delete {
        /// Date as YYYY-MM-DD
        date: String,
        index: usize,
    },
    /// Manage local backups taken before each sync
    Backups {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Append events from a Calcure or Calcurse file to the local calendar
    Import {
        format: ImportSource,
        /// Defaults to the application's own events file
        file: Option<PathBuf>,
    },
    /// List remote revisions of the calendar file
    History {
        /// Maximum number of revisions to show
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Replace the local calendar with a remote revision
    RestoreRevision {
        revision: String,
        /// Overwrite the local calendar without asking
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// List backups, newest first
    List,
    /// Copy a backup over the local calendar
    Restore {
        /// Backup file name as shown by `geekcal backups list`
        name: String,
        /// Overwrite the local calendar without asking
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportSource {
    Calcure,
    Calcurse,
}

impl From<ImportSource> for ImportFormat {
    fn from(source: ImportSource) -> Self {
        match source {
            ImportSource::Calcure => ImportFormat::Calcure,
            ImportSource::Calcurse => ImportFormat::Calcurse,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load()?;

    match cli.command {
        Commands::Sync => commands::sync::run(&settings).await,
        Commands::Status => commands::status::run(&settings).await,
        Commands::Add { date, text } => commands::events::add(&settings, &date, text),
        Commands::List { date } => commands::events::list(&settings, date.as_deref()),
        Commands::Delete { date, index } => commands::events::delete(&settings, &date, index),
        Commands::Backups { command } => match command {
            BackupCommands::List => commands::backups::list(&settings),
            BackupCommands::Restore { name, yes } => commands::backups::restore(&settings, &name, yes),
        },
        Commands::Import { format, file } => {
            commands::import::run(&settings, format.into(), file)
        }
        Commands::History { limit } => commands::history::run(&settings, limit).await,
        Commands::RestoreRevision { revision, yes } => {
            commands::history::restore(&settings, &revision, yes).await
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
