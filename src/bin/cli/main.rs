mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use kotoba_lib::srs::{ImportMode, OverrideOp, Rating, ReadingKind};

#[derive(Parser)]
#[command(name = "kotoba-cli", about = "Kotoba spaced repetition CLI", version)]
struct Cli {
    /// Config file (default: <config dir>/kotoba/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User whose cards to work on
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Review a word reading, or preview the next intervals
    Review {
        /// Dictionary word id
        word: i64,
        /// Rating: again|hard|good|easy or 1-4 (omit to preview)
        rating: Option<Rating>,
        /// Reading variant index
        #[arg(long, default_value = "0")]
        reading: u32,
        /// Time spent answering, in milliseconds
        #[arg(long)]
        duration_ms: Option<u32>,
        /// Show the interval each rating would give without reviewing
        #[arg(long)]
        preview: bool,
    },

    /// Scheduler settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Recompute memory state from review history
    Recompute {
        /// Resume after this card id
        #[arg(long)]
        after: Option<i64>,
        /// Process a single page of this size instead of everything
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Apply a manual override to a word reading
    Override {
        /// master-add | master-remove | blacklist-add | blacklist-remove | forget
        op: OverrideOp,
        /// Dictionary word id
        word: i64,
        /// Reading variant index
        #[arg(long, default_value = "0")]
        reading: u32,
    },

    /// Show the known state of a word's readings
    Classify {
        /// Dictionary word id
        word: i64,
        /// Reading variant indexes (default: 0)
        #[arg(long, value_delimiter = ',', default_value = "0")]
        readings: Vec<u32>,
    },

    /// Dictionary words
    #[command(subcommand)]
    Word(WordCommand),

    /// Export cards, history and settings as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import a JSON export
    Import {
        /// Input file ("-" for stdin)
        input: PathBuf,
        /// merge | overwrite
        #[arg(long, default_value = "merge")]
        mode: ImportMode,
    },
}

#[derive(Subcommand)]
enum SettingsCommand {
    /// Show effective settings
    Show,

    /// Change weights and/or desired retention
    Set {
        /// Comma-separated weights; an empty string resets to defaults
        #[arg(long)]
        weights: Option<String>,
        /// Desired retention, between 0 and 1
        #[arg(long)]
        retention: Option<f64>,
        /// Recompute all cards afterwards
        #[arg(long)]
        recompute: bool,
    },
}

#[derive(Subcommand)]
enum WordCommand {
    /// Register reading variants of a word
    Add {
        /// Dictionary word id
        word: i64,
        /// Variants as index:kind pairs, e.g. 0:kanji,1:kana
        #[arg(long, value_delimiter = ',', required = true)]
        readings: Vec<String>,
    },
}

fn parse_reading(raw: &str) -> anyhow::Result<(u32, ReadingKind)> {
    let (index, kind) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("Expected index:kind, got '{}'", raw))?;
    Ok((index.trim().parse()?, kind.trim().parse()?))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(cli.config.as_deref(), &cli.user)?;

    match cli.command {
        Command::Review { word, rating, reading, duration_ms, preview } => match rating {
            Some(rating) if !preview => {
                commands::review::run(&app, word, reading, rating, duration_ms, &cli.format, use_color)?;
            }
            _ => commands::review::run_preview(&app, word, reading, &cli.format, use_color)?,
        },
        Command::Settings(SettingsCommand::Show) => {
            commands::settings::run_show(&app, &cli.format)?;
        }
        Command::Settings(SettingsCommand::Set { weights, retention, recompute }) => {
            commands::settings::run_set(&app, weights.as_deref(), retention, recompute, &cli.format)?;
        }
        Command::Recompute { after, page_size } => {
            commands::recompute::run(&app, after, page_size, &cli.format)?;
        }
        Command::Override { op, word, reading } => {
            commands::overrides::run(&app, op, word, reading, &cli.format, use_color)?;
        }
        Command::Classify { word, readings } => {
            commands::classify::run(&app, word, &readings, &cli.format, use_color)?;
        }
        Command::Word(WordCommand::Add { word, readings }) => {
            let readings = readings
                .iter()
                .map(|raw| parse_reading(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;
            commands::words::run_add(&app, word, &readings, &cli.format)?;
        }
        Command::Export { output } => {
            commands::transfer::run_export(&app, output.as_deref(), &cli.format)?;
        }
        Command::Import { input, mode } => {
            commands::transfer::run_import(&app, &input, mode, &cli.format)?;
        }
    }

    Ok(())
}
