//! Export command implementation
//!
//! This module implements the `export` command for exporting Home Assistant
//! statistics to InfluxDB.

use super::load_or_report;
use crate::core::export::{ExportCoordinator, ExportOptions, ExportSummary};
use crate::domain::HastatsError;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Continue from the checkpoint file
    #[arg(long)]
    pub resume: bool,

    /// Validate only - read and check everything without writing to InfluxDB
    #[arg(long)]
    pub dry_run: bool,

    /// Only export entities whose statistic id contains this text
    #[arg(long, value_name = "PATTERN")]
    pub entities: Option<String>,

    /// Resume even if the checkpoint was written with different settings
    #[arg(long, requires = "resume")]
    pub force_resume: bool,
}

impl ExportArgs {
    fn options(&self, config_dry_run: bool) -> ExportOptions {
        ExportOptions {
            resume: self.resume,
            force_resume: self.force_resume,
            dry_run: self.dry_run || config_dry_run,
            entity_pattern: self
                .entities
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let options = self.options(config.application.dry_run);

        if options.dry_run {
            tracing::info!("Dry run mode enabled - no data will be written");
            println!("🔍 DRY RUN MODE - No data will be written to InfluxDB");
            println!();
        }

        // Confirmation prompt (unless --yes or dry-run)
        if !self.yes && !options.dry_run {
            println!("Export Configuration:");
            println!("  Source: {}", config.source.database_path);
            println!("  InfluxDB: {} (org {})", config.influxdb.url, config.influxdb.org);
            println!("  Recent bucket: {}", config.influxdb.bucket_recent);
            println!("  Historical bucket: {}", config.influxdb.bucket_historical);
            println!(
                "  Entities: {}",
                options.entity_pattern.as_deref().unwrap_or("All admitted")
            );
            println!("  Batch size: {}", config.export.batch_size);
            println!("  Resume: {}", if options.resume { "yes" } else { "no" });
            println!();
            print!("Proceed with export? [y/N]: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Export cancelled.");
                return Ok(0);
            }
        }

        tracing::info!("Creating export coordinator");
        let coordinator = match ExportCoordinator::from_config(config, options, shutdown_signal).await
        {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        tracing::info!("Executing export");
        println!("🚀 Starting export...");
        println!();

        let summary = match coordinator.execute_export().await {
            Ok(s) => s,
            Err(e @ HastatsError::Configuration(_)) => {
                tracing::error!(error = %e, "Export refused");
                eprintln!("Export refused: {e}");
                return Ok(2);
            }
            Err(e) => {
                tracing::error!(error = %e, "Export failed");
                eprintln!("Export failed: {e}");
                eprintln!("Progress up to the last written batch is saved; rerun with --resume.");
                return Ok(5); // Fatal error exit code
            }
        };

        print_summary(&summary);

        let exit_code = if summary.interrupted {
            println!();
            println!("⚠️  Export interrupted gracefully. Progress saved.");
            println!("   Run the same command with --resume to continue.");
            println!();
            tracing::info!("Export interrupted by user signal");
            130 // SIGINT exit code (standard Unix convention)
        } else if summary.is_successful() {
            println!("✅ Export completed successfully!");
            0
        } else {
            println!("⚠️  Export completed with failures");
            1
        };

        Ok(exit_code)
    }
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("📊 Export Summary:");
    println!("  Run: {}", summary.run_id);
    println!(
        "  Entities: {} admitted of {} ({} already done)",
        summary.entities_included, summary.entities_total, summary.entities_resumed_skipped
    );
    for table in &summary.tables {
        if table.skipped {
            println!("  {} → {}: skipped (already exported)", table.table, table.bucket);
        } else {
            println!(
                "  {} → {}: {} records, {} points, {} batches",
                table.table, table.bucket, table.records_read, table.points_written, table.batches
            );
        }
    }
    let metrics = &summary.metrics;
    println!(
        "  Records: {} valid, {} invalid, {} skipped, {} corrected",
        metrics.valid, metrics.invalid, metrics.skipped, metrics.corrected
    );
    println!("  Duplicates: {}", metrics.duplicates);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Throughput: {:.1} records/s", summary.records_per_second());
    println!("  Write time: {:.2}s", summary.write_time.as_secs_f64());
    println!("  Success Rate: {:.2}%", summary.success_rate());
    println!();

    let report = summary.issue_report();
    if !report.is_empty() {
        println!("🔎 Data quality issues:");
        for line in report {
            println!("  {line}");
        }
        println!();
    }

    if !summary.errors.is_empty() {
        println!("⚠️  Errors encountered:");
        for error in &summary.errors {
            println!("  - {:?}: {}", error.error_type, error.message);
            if let Some(context) = &error.context {
                println!("    Context: {context}");
            }
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ExportArgs {
        ExportArgs {
            yes: false,
            resume: false,
            dry_run: false,
            entities: None,
            force_resume: false,
        }
    }

    #[test]
    fn test_export_args_defaults() {
        let options = args().options(false);
        assert!(!options.resume);
        assert!(!options.dry_run);
        assert!(options.entity_pattern.is_none());
    }

    #[test]
    fn test_config_dry_run_applies() {
        assert!(args().options(true).dry_run);
    }

    #[test]
    fn test_blank_entity_pattern_is_ignored() {
        let mut a = args();
        a.entities = Some("   ".to_string());
        assert!(a.options(false).entity_pattern.is_none());

        a.entities = Some(" power ".to_string());
        assert_eq!(a.options(false).entity_pattern.as_deref(), Some("power"));
    }
}
