//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Hastats configuration file.

use crate::config::{load_config, masked, HastatsConfig};
use clap::Args;
use std::path::Path;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading runs the full validation
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        print_summary(&config);

        if !Path::new(&config.source.database_path).exists() {
            println!();
            println!(
                "⚠️  Source database not found: {}",
                config.source.database_path
            );
        }

        Ok(0)
    }
}

fn print_summary(config: &HastatsConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Dry Run: {}", config.application.dry_run);
    println!("  Source Database: {}", config.source.database_path);
    println!("  InfluxDB URL: {}", config.influxdb.url);
    println!("  InfluxDB Org: {}", config.influxdb.org);
    println!("  InfluxDB Token: {}", masked(&config.influxdb.token));
    println!(
        "  Buckets: {} ({} days) / {} (unlimited)",
        config.influxdb.bucket_recent,
        config.influxdb.recent_retention_days,
        config.influxdb.bucket_historical
    );
    println!("  Batch Size: {}", config.export.batch_size);
    println!(
        "  Year Window: {}..{}",
        config.export.min_year, config.export.max_year
    );
    println!("  Checkpoint: {}", config.export.checkpoint_file);
    println!("  Included Units: {}", config.filter.include_units.join(", "));
    println!("  Included Domains: {}", config.filter.include_domains.join(", "));
    println!(
        "  Unit Range Overrides: {}",
        config.quality.unit_ranges.len()
    );
    println!(
        "  Retry: {} attempts, {}ms..{}ms",
        config.retry.max_retries, config.retry.initial_delay_ms, config.retry.max_delay_ms
    );
    println!(
        "  File Logging: {}",
        if config.logging.local_enabled {
            config.logging.local_path.as_str()
        } else {
            "disabled"
        }
    );
}
