//! Status command implementation
//!
//! This module implements the `status` command for displaying the export
//! checkpoint.

use super::load_or_report;
use crate::core::state::{CheckpointManager, CheckpointStatus, ExportCheckpoint};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the raw checkpoint as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let manager = CheckpointManager::from_path(&config.export.checkpoint_file);
        let checkpoint = match manager.load().await {
            Ok(Some(cp)) => cp,
            Ok(None) => {
                println!("No export in progress ({} not found)", manager.location());
                return Ok(0);
            }
            Err(e) => {
                println!("❌ Failed to read checkpoint {}", manager.location());
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&checkpoint)?);
            return Ok(0);
        }

        println!("📊 Export Status");
        println!();
        print_checkpoint(&checkpoint);

        Ok(0)
    }
}

fn status_label(status: CheckpointStatus) -> &'static str {
    match status {
        CheckpointStatus::Fresh => "🆕 Fresh",
        CheckpointStatus::InProgress => "⏳ In progress (resume with `hastats export --resume`)",
        CheckpointStatus::Completed => "✅ Completed",
        CheckpointStatus::Failed => "❌ Failed (resume with `hastats export --resume`)",
    }
}

fn print_checkpoint(checkpoint: &ExportCheckpoint) {
    println!("  Export: {}", checkpoint.export_id);
    println!("  Status: {}", status_label(checkpoint.status));
    println!("  Started: {}", checkpoint.start_time.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Updated: {}", checkpoint.last_update.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "  Entities: {}/{} completed, {} failed",
        checkpoint.entities_completed,
        checkpoint.total_entities,
        checkpoint.failed_metadata_ids.len()
    );
    println!(
        "  Records: {} short-term, {} long-term",
        checkpoint.short_term_records_processed, checkpoint.long_term_records_processed
    );
    println!("  Points written: {}", checkpoint.total_points_written);

    if !checkpoint.completed_tables.is_empty() {
        let tables: Vec<String> = checkpoint
            .completed_tables
            .iter()
            .map(ToString::to_string)
            .collect();
        println!("  Completed tables: {}", tables.join(", "));
    }
    for (table, cursor) in &checkpoint.cursors {
        println!(
            "  {table}: at metadata_id {} / start_ts {} / row {}",
            cursor.metadata_id, cursor.start_ts, cursor.id
        );
    }
    println!();
}
