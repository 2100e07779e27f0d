//! Setup command implementation
//!
//! Creates the two destination buckets. Existing buckets are left as they are.

use super::load_or_report;
use crate::adapters::factory::create_influx_client;
use crate::adapters::influx::BucketAdmin;
use crate::config::InfluxConfig;
use clap::Args;
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;

/// A bucket `setup` makes sure exists
#[derive(Debug, Clone, PartialEq)]
struct BucketSpec {
    name: String,
    retention: Option<Duration>,
    description: String,
}

fn planned_buckets(config: &InfluxConfig) -> [BucketSpec; 2] {
    let days = config.recent_retention_days;
    let recent_retention = (days > 0).then(|| Duration::from_secs(u64::from(days) * SECONDS_PER_DAY));
    [
        BucketSpec {
            name: config.bucket_recent.clone(),
            retention: recent_retention,
            description: format!("Home Assistant recent data ({days} day retention)"),
        },
        BucketSpec {
            name: config.bucket_historical.clone(),
            retention: None,
            description: "Home Assistant historical aggregated data (unlimited retention)"
                .to_string(),
        },
    ]
}

/// Arguments for the setup command
#[derive(Args, Debug)]
pub struct SetupArgs {}

impl SetupArgs {
    /// Execute the setup command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Setting up InfluxDB buckets");

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

        if let Err(e) = client.health().await {
            println!("❌ InfluxDB at {} is not reachable", client.base_url());
            println!("   Error: {e}");
            return Ok(4);
        }

        println!("🛠️  Setting up buckets in org '{}'", client.org());
        println!();

        for planned in planned_buckets(&config.influxdb) {
            match client
                .create_bucket(&planned.name, planned.retention, &planned.description)
                .await
            {
                Ok(true) => println!("✅ Created bucket: {}", planned.name),
                Ok(false) => println!("✓ Bucket already exists: {}", planned.name),
                Err(e) => {
                    tracing::error!(bucket = %planned.name, error = %e, "Failed to create bucket");
                    println!("❌ Failed to create bucket {}", planned.name);
                    println!("   Error: {e}");
                    return Ok(1);
                }
            }
        }

        println!();
        println!("Buckets are ready. Next: hastats export");
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn influx(days: u32) -> InfluxConfig {
        InfluxConfig {
            url: "http://localhost:8086".to_string(),
            token: secret_string("token".to_string()),
            org: "home".to_string(),
            bucket_recent: "ha_recent".to_string(),
            bucket_historical: "ha_historical".to_string(),
            recent_retention_days: days,
            timeout_seconds: 30,
            tls_verify: true,
        }
    }

    #[test]
    fn test_recent_bucket_gets_retention() {
        let [recent, historical] = planned_buckets(&influx(90));
        assert_eq!(recent.name, "ha_recent");
        assert_eq!(recent.retention, Some(Duration::from_secs(90 * 86_400)));
        assert_eq!(
            recent.description,
            "Home Assistant recent data (90 day retention)"
        );
        assert_eq!(historical.name, "ha_historical");
        assert_eq!(historical.retention, None);
    }

    #[test]
    fn test_zero_days_means_unlimited() {
        let [recent, _] = planned_buckets(&influx(0));
        assert_eq!(recent.retention, None);
    }
}
