//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// absendo - The lessons you missed, ready for the absence form
#[derive(Debug, Parser)]
#[command(name = "absendo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "ABSENDO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the lessons on a day of absence
    Lessons(LessonsArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of the `lessons` command.
#[derive(Debug, Clone, Args)]
pub struct LessonsArgs {
    /// Calendar (ICS) URL
    pub url: String,

    /// Day of absence (YYYY-MM-DD or DD.MM.YYYY, default: today)
    #[arg(long, short, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Show subject and teacher short codes instead of full names
    #[arg(long)]
    pub short_names: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    absendo_core::parse_absence_date(s)
        .ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD or DD.MM.YYYY", s))
}
