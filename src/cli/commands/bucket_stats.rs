//! Bucket-stats command implementation

use super::load_or_report;
use crate::adapters::factory::create_influx_client;
use crate::adapters::influx::{bucket_stats, BucketStats};
use clap::Args;

/// Arguments for the bucket-stats command
#[derive(Args, Debug)]
pub struct BucketStatsArgs {
    /// Print the statistics as JSON
    #[arg(long)]
    pub json: bool,
}

impl BucketStatsArgs {
    /// Execute the bucket-stats command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let client = match create_influx_client(&config) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to create InfluxDB client");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let mut all = Vec::new();
        for bucket in [&config.influxdb.bucket_recent, &config.influxdb.bucket_historical] {
            match bucket_stats(client.as_ref(), bucket).await {
                Ok(stats) => all.push(stats),
                Err(e) => {
                    tracing::error!(bucket = %bucket, error = %e, "Failed to read bucket statistics");
                    println!("❌ Failed to read statistics for {bucket}");
                    println!("   Error: {e}");
                    return Ok(4);
                }
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&all)?);
            return Ok(0);
        }

        for stats in &all {
            print_stats(stats);
        }
        Ok(0)
    }
}

fn print_stats(stats: &BucketStats) {
    println!("🪣 {}", stats.bucket);
    if !stats.exists {
        println!("  Not found (run `hastats setup`)");
        println!();
        return;
    }
    println!("  Points (last 30 days): {}", stats.points_last_30_days);
    println!("  Points (all time): {}", stats.points_all_time);
    println!("  Measurements: {}", stats.measurements.len());
    if let (Some(earliest), Some(latest)) = (&stats.earliest, &stats.latest) {
        println!("  Time range: {earliest} .. {latest}");
    }
    println!();
}
