//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Hastats using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Hastats - Home Assistant statistics to InfluxDB exporter
#[derive(Parser, Debug)]
#[command(name = "hastats")]
#[command(version, about, long_about = None)]
#[command(author = "Hastats Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hastats.toml", env = "HASTATS_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HASTATS_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Verbose output; also lowers the default log level to debug
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level from `--log-level`, then `--verbose`, then `fallback`.
    pub fn effective_log_level<'a>(&'a self, fallback: &'a str) -> &'a str {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => level.as_str(),
            (None, true) => "debug",
            (None, false) => fallback,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export statistics from the Home Assistant database to InfluxDB
    Export(commands::export::ExportArgs),

    /// Classify entities and show what an export would include
    AnalyzeEntities(commands::analyze::AnalyzeArgs),

    /// Show sample points from a bucket
    Query(commands::query::QueryArgs),

    /// Create the recent and historical buckets
    Setup(commands::setup::SetupArgs),

    /// Show point counts and time range per bucket
    BucketStats(commands::bucket_stats::BucketStatsArgs),

    /// Delete all migrated points from both buckets
    Cleanup(commands::cleanup::CleanupArgs),

    /// Show the export checkpoint
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
