//! Query command implementation
//!
//! Prints a handful of points from a bucket to check what an export wrote.

use super::load_or_report;
use crate::adapters::factory::create_influx_client;
use crate::adapters::influx::{sample_query, PointReader, QueryRow};
use clap::Args;

/// Arguments for the query command
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Bucket to query (defaults to the recent bucket)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Entity to show, e.g. `sensor.grid_power`
    #[arg(long)]
    pub entity: Option<String>,

    /// How many days back to look
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Maximum rows per series
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

impl QueryArgs {
    /// Execute the query command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let bucket = self
            .bucket
            .clone()
            .unwrap_or_else(|| config.influxdb.bucket_recent.clone());
        let flux = sample_query(&bucket, self.entity.as_deref(), self.days, self.limit);
        tracing::debug!(bucket = %bucket, flux = %flux, "Running sample query");

        let client = match create_influx_client(&config) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to create InfluxDB client");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let rows = match client.query(&flux).await {
            Ok(rows) => rows,
            Err(e) => {
                println!("❌ Query failed");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        println!(
            "📈 {} rows from {} (last {} days)",
            rows.len(),
            bucket,
            self.days
        );
        println!();
        for row in &rows {
            println!("  {}", format_row(row));
        }

        Ok(0)
    }
}

fn format_row(row: &QueryRow) -> String {
    let field = |name: &str| row.get(name).map(String::as_str).unwrap_or("?");
    format!(
        "{}: {} at {}",
        field("entity_id"),
        field("_value"),
        field("_time")
    )
}
