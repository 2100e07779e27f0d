//! CLI command implementations
//!
//! Every command returns the process exit code:
//! 0 success, 1 failure, 2 configuration error, 4 connection error,
//! 5 fatal error, 130 interrupted.

pub mod analyze;
pub mod bucket_stats;
pub mod cleanup;
pub mod export;
pub mod init;
pub mod query;
pub mod setup;
pub mod status;
pub mod validate;

use crate::config::{load_config, HastatsConfig};

/// Loads the configuration, printing the failure. `Err` carries exit code 2.
pub(crate) fn load_or_report(config_path: &str) -> Result<HastatsConfig, i32> {
    load_config(config_path).map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        println!("❌ Failed to load configuration file");
        println!("   Error: {e}");
        2
    })
}
