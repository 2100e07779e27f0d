//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "hastats.toml")]
    pub output: String,

    /// Write every section with its defaults and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Hastats configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Put INFLUXDB_TOKEN=<token> in a .env file or your environment");
                println!("  3. Validate configuration: hastats validate-config");
                println!("  4. Create the buckets: hastats setup");
                println!("  5. Preview the export: hastats export --dry-run");
                println!("  6. Run export: hastats export");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Hastats Configuration File
# Home Assistant statistics to InfluxDB exporter

[source]
database_path = "./home-assistant_v2.db"

[influxdb]
url = "http://localhost:8086"
token = "${INFLUXDB_TOKEN}"
org = "home"
bucket_recent = "homeassistant-recent"
bucket_historical = "homeassistant-historical"

[export]
batch_size = 1000
checkpoint_file = "./export_checkpoint.json"
"#
        .to_string()
    }

    /// Generate configuration with every section documented
    fn generate_config_with_examples() -> String {
        r#"# Hastats Configuration File
# Home Assistant statistics to InfluxDB exporter
#
# Any value can be overridden with HASTATS_<SECTION>_<KEY>,
# e.g. HASTATS_EXPORT_BATCH_SIZE=500. ${VAR} placeholders are
# replaced from the environment (or a .env file).

[application]
# trace, debug, info, warn, error
log_level = "info"
# Validate everything but write nothing
dry_run = false

[source]
# Home Assistant recorder database, opened read-only
database_path = "./home-assistant_v2.db"

[influxdb]
url = "http://localhost:8086"
token = "${INFLUXDB_TOKEN}"
org = "home"
# statistics_short_term (5-minute) rows go here
bucket_recent = "homeassistant-recent"
# statistics (hourly) rows go here
bucket_historical = "homeassistant-historical"
# Retention `hastats setup` gives the recent bucket; 0 keeps data forever
recent_retention_days = 90
timeout_seconds = 30
tls_verify = true

[export]
batch_size = 1000
# Log progress every N batches
progress_interval = 10
# Keep a checkpoint so an interrupted export can continue with --resume
resume_enabled = true
checkpoint_file = "./export_checkpoint.json"
# Rows outside [min_year, max_year) are treated as corrupt
min_year = 2020
max_year = 2030

[filter]
include_units = ["kWh", "W", "°C", "°F", "kB/s", "GB", "MB", "A", "V", "hPa", "bar", "mbar", "lux", "ppm", "dB", "rpm"]
# Statistics sources exported regardless of unit
include_sources = ["tibber"]
exclude_patterns = ["%availability%", "%status%", "%signal%", "%connected%"]
include_domains = ["sensor", "counter", "weather", "climate", "utility_meter"]

# Per-unit plausibility overrides; either bound may be omitted
# [quality.unit_ranges."W"]
# min = 0.0
# max = 20000.0

[retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[logging]
# JSON log files in addition to the console
local_enabled = false
local_path = "./logs"
# daily, hourly, never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HastatsConfig;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "hastats.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "hastats.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[source]"));
        assert!(config.contains("[influxdb]"));
        assert!(config.contains("${INFLUXDB_TOKEN}"));
    }

    #[test]
    fn test_generated_configs_parse() {
        for content in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            let config: HastatsConfig = toml::from_str(&content).unwrap();
            assert_eq!(config.influxdb.org, "home");
            assert_eq!(config.export.batch_size, 1000);
        }
    }

    #[tokio::test]
    async fn test_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hastats.toml");
        fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            with_examples: false,
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");
    }
}
