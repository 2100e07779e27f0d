//! Cleanup command implementation
//!
//! Deletes every point tagged `source=migration` from both buckets. Live
//! data written by Home Assistant itself is untouched.

use super::load_or_report;
use crate::adapters::factory::create_influx_client;
use crate::adapters::influx::{BucketAdmin, PointReader};
use clap::Args;

/// Word the operator must type to confirm
const CONFIRMATION: &str = "DELETE";

/// Arguments for the cleanup command
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Skip the typed confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl CleanupArgs {
    /// Execute the cleanup command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let buckets = [
            config.influxdb.bucket_recent.clone(),
            config.influxdb.bucket_historical.clone(),
        ];

        if !self.yes {
            println!("⚠️  This deletes all migrated points (source=migration) from:");
            for bucket in &buckets {
                println!("  - {bucket}");
            }
            println!();
            print!("Type {CONFIRMATION} to continue: ");
            use std::io::{self, Write};
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !is_confirmed(&input) {
                println!("Cleanup cancelled.");
                return Ok(0);
            }
        }

        let client = match create_influx_client(&config) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to create InfluxDB client");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let mut failed = false;
        for bucket in &buckets {
            match client.bucket_exists(bucket).await {
                Ok(false) => {
                    println!("✓ {bucket}: does not exist, nothing to delete");
                    continue;
                }
                Ok(true) => {}
                Err(e) => {
                    println!("❌ {bucket}: {e}");
                    return Ok(4);
                }
            }

            match client.delete_migration_data(bucket).await {
                Ok(()) => println!("✅ {bucket}: migrated data deleted"),
                Err(e) => {
                    tracing::error!(bucket = %bucket, error = %e, "Cleanup failed");
                    println!("❌ {bucket}: {e}");
                    failed = true;
                }
            }
        }

        Ok(if failed { 1 } else { 0 })
    }
}

fn is_confirmed(input: &str) -> bool {
    input.trim() == CONFIRMATION
}
