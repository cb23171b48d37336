//! CLI argument definitions for the cohort reconciler.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cohort-reconcile",
    version,
    about = "Cohort Reconciler - Incrementally cleanse student cohort data",
    long_about = "Reconcile raw student, course and job tables into a single \
                  cleansed, denormalized table.\n\n\
                  Each run commits only records not yet present, quarantines \
                  records with unrecoverable gaps, and versions the cleansed \
                  table through a markdown changelog."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Execute one reconciliation run against a source database.
    Run(RunArgs),

    /// Seed an empty changelog at version 0.0.0.
    Init(InitArgs),

    /// Print the current version and store row counts.
    Status(StatusArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the source SQLite database (students, courses, student_jobs).
    #[arg(value_name = "SOURCE_DB")]
    pub source_db: PathBuf,

    /// Cleansed store database (default: <source dir>/cleansed.db).
    #[arg(long = "cleansed-db", value_name = "PATH")]
    pub cleansed_db: Option<PathBuf>,

    /// Changelog file (default: <source dir>/changelog.md).
    #[arg(long = "changelog", value_name = "PATH")]
    pub changelog: Option<PathBuf>,

    /// Flat CSV snapshot of the cleansed table (default: <source dir>/cleansed.csv).
    #[arg(long = "snapshot", value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Reference date for age derivation, YYYY-MM-DD (default: today).
    #[arg(long = "as-of", value_name = "DATE")]
    pub as_of: Option<NaiveDate>,

    /// Run every stage and check without writing anything.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Changelog file to create. Refuses to overwrite an existing file.
    #[arg(value_name = "CHANGELOG", default_value = "changelog.md")]
    pub changelog: PathBuf,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// Path to the cleansed store database.
    #[arg(value_name = "CLEANSED_DB")]
    pub cleansed_db: PathBuf,

    /// Changelog file (default: <cleansed dir>/changelog.md).
    #[arg(long = "changelog", value_name = "PATH")]
    pub changelog: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
