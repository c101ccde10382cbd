//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Values left unset here fall back to the
//! configuration file, then to built-in defaults.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// cotask - partitioned parallel sums and a watchdog-supervised counter
///
/// Examples:
///   cotask sum --rows 3 --cols 2 --workers 2
///   cotask sum --input data.csv --workers 8 --format json --output sum.json
///   cotask count --tick-ms 100 --deadline-secs 10
///   cotask --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Option<Mode>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cotask.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .cotask.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Sum every element of a matrix with parallel worker tasks
    Sum(SumArgs),
    /// Run the counter agent under a watchdog
    ///
    /// Type `up`, `down` or `stop` followed by Enter to steer the counter.
    /// Ctrl-C interrupts the watchdog, which then stops the counter.
    Count(CountArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct SumArgs {
    /// Matrix file (.json array of arrays, or delimited text)
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["rows", "cols"])]
    pub input: Option<PathBuf>,

    /// Rows of a generated matrix (1, 2, 3, ... row-major)
    #[arg(long, value_name = "N", requires = "cols")]
    pub rows: Option<usize>,

    /// Columns of a generated matrix
    #[arg(long, value_name = "N", requires = "rows")]
    pub cols: Option<usize>,

    /// Number of worker tasks to request
    #[arg(short, long, value_name = "NUM", env = "COTASK_WORKERS")]
    pub workers: Option<usize>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print only the total, without the per-partition report
    #[arg(long, conflicts_with = "format")]
    pub total_only: bool,
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct CountArgs {
    /// Milliseconds between two ticks
    #[arg(long, value_name = "MS")]
    pub tick_ms: Option<u64>,

    /// Seconds before the watchdog stops the counter
    #[arg(long, value_name = "SECS")]
    pub deadline_secs: Option<u64>,

    /// Initial counter value
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub start: Option<i64>,

    /// Output format of the final report (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Do not draw the live counter spinner
    #[arg(long)]
    pub no_spinner: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.mode {
            None => Err("A subcommand is required: sum or count (see --help)".to_string()),
            Some(Mode::Sum(sum)) => sum.validate(),
            Some(Mode::Count(count)) => count.validate(),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl SumArgs {
    fn validate(&self) -> Result<(), String> {
        if self.workers == Some(0) {
            return Err("Workers must be at least 1".to_string());
        }

        match (self.input.is_some(), self.rows, self.cols) {
            (true, None, None) => Ok(()),
            (true, _, _) => Err("Cannot combine --input with --rows/--cols".to_string()),
            (false, Some(_), Some(_)) => Ok(()),
            (false, Some(_), None) | (false, None, Some(_)) => {
                Err("--rows and --cols must be given together".to_string())
            }
            (false, None, None) => Err("Provide --input FILE or --rows N --cols N".to_string()),
        }
    }
}

impl CountArgs {
    fn validate(&self) -> Result<(), String> {
        if self.tick_ms == Some(0) {
            return Err("Tick must be at least 1 millisecond".to_string());
        }
        if self.deadline_secs == Some(0) {
            return Err("Watchdog deadline must be at least 1 second".to_string());
        }
        Ok(())
    }
}
