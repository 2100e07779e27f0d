//! Configuration schema types
//!
//! This module defines the configuration structure for Hastats. Every section
//! except `[influxdb]` has defaults, so a minimal file only needs the InfluxDB
//! token and organization.

use crate::config::SecretString;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main Hastats configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HastatsConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Home Assistant recorder database
    #[serde(default)]
    pub source: SourceConfig,

    /// InfluxDB 2 destination
    pub influxdb: InfluxConfig,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Entity selection
    #[serde(default)]
    pub filter: FilterConfig,

    /// Data quality rule overrides
    #[serde(default)]
    pub quality: QualityConfig,

    /// Retry policy for source reads, destination writes and checkpoint saves
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HastatsConfig {
    /// Loads, substitutes, overrides and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::domain::Result<Self> {
        super::loader::load_config(path)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate()?;
        self.influxdb.validate()?;
        self.export.validate()?;
        self.filter.validate()?;
        self.quality.validate()?;
        self.retry.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Validate records without writing to InfluxDB
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Home Assistant recorder database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to `home-assistant_v2.db`
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<(), String> {
        if self.database_path.trim().is_empty() {
            return Err("source.database_path cannot be empty".to_string());
        }
        if !Path::new(&self.database_path).exists() {
            return Err(format!(
                "Home Assistant database not found: {}",
                self.database_path
            ));
        }
        Ok(())
    }
}

/// InfluxDB 2 configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL of the InfluxDB server
    #[serde(default = "default_influx_url")]
    pub url: String,

    /// API token
    /// Stored securely in memory and automatically zeroized on drop
    pub token: SecretString,

    /// Organization name
    pub org: String,

    /// Bucket receiving `statistics_short_term` rows
    #[serde(default = "default_bucket_recent")]
    pub bucket_recent: String,

    /// Bucket receiving `statistics` rows
    #[serde(default = "default_bucket_historical")]
    pub bucket_historical: String,

    /// Retention applied by `setup` to the recent bucket (0 = infinite)
    #[serde(default = "default_recent_retention_days")]
    pub recent_retention_days: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Verify TLS certificates
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl InfluxConfig {
    fn validate(&self) -> Result<(), String> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| format!("influxdb.url '{}' is not a valid URL: {}", self.url, e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!(
                "influxdb.url must use http or https, got '{}'",
                parsed.scheme()
            ));
        }

        if self.token.expose_secret().is_empty() {
            return Err("influxdb.token is required".to_string());
        }

        if self.org.trim().is_empty() {
            return Err("influxdb.org is required".to_string());
        }

        if self.bucket_recent.trim().is_empty() || self.bucket_historical.trim().is_empty() {
            return Err("influxdb bucket names cannot be empty".to_string());
        }

        if self.bucket_recent == self.bucket_historical {
            return Err(format!(
                "influxdb.bucket_recent and influxdb.bucket_historical must differ (both '{}')",
                self.bucket_recent
            ));
        }

        if self.timeout_seconds == 0 {
            return Err("influxdb.timeout_seconds must be > 0".to_string());
        }

        Ok(())
    }
}

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Records per page read from the database
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Emit a progress line every N batches
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Keep a checkpoint file so an interrupted export can resume
    #[serde(default = "default_true")]
    pub resume_enabled: bool,

    /// Checkpoint file location
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: String,

    /// Rows starting before January 1st of this year are rejected
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    /// Rows starting on or after January 1st of this year are rejected
    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            progress_interval: default_progress_interval(),
            resume_enabled: true,
            checkpoint_file: default_checkpoint_file(),
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("export.batch_size must be > 0".to_string());
        }

        if self.progress_interval == 0 {
            return Err("export.progress_interval must be > 0".to_string());
        }

        if self.checkpoint_file.trim().is_empty() {
            return Err("export.checkpoint_file cannot be empty".to_string());
        }

        if self.min_year >= self.max_year {
            return Err(format!(
                "export.min_year ({}) must be before export.max_year ({})",
                self.min_year, self.max_year
            ));
        }

        Ok(())
    }
}

/// Entity selection rules used by the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Units that are exported even when they map to no named category
    #[serde(default = "default_include_units")]
    pub include_units: Vec<String>,

    /// Integrations whose statistics are always exported as `special`
    #[serde(default = "default_include_sources")]
    pub include_sources: Vec<String>,

    /// Substrings (SQL-style `%` wildcards are stripped) excluding an entity id
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Entity domains eligible for export
    #[serde(default = "default_include_domains")]
    pub include_domains: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_units: default_include_units(),
            include_sources: default_include_sources(),
            exclude_patterns: default_exclude_patterns(),
            include_domains: default_include_domains(),
        }
    }
}

impl FilterConfig {
    fn validate(&self) -> Result<(), String> {
        if self.include_domains.is_empty() {
            return Err("filter.include_domains cannot be empty".to_string());
        }
        if self
            .exclude_patterns
            .iter()
            .any(|p| p.trim_matches('%').trim().is_empty())
        {
            return Err("filter.exclude_patterns cannot contain empty patterns".to_string());
        }
        Ok(())
    }
}

/// Inclusive bounds for one unit; a missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// Data quality configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Per-unit range overrides merged over the built-in table
    #[serde(default)]
    pub unit_ranges: BTreeMap<String, UnitRange>,
}

impl QualityConfig {
    fn validate(&self) -> Result<(), String> {
        for (unit, range) in &self.unit_ranges {
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(format!(
                        "quality.unit_ranges.\"{unit}\": min {min} is greater than max {max}"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_retries > 10 {
            return Err(format!(
                "retry.max_retries must be <= 10, got {}",
                self.max_retries
            ));
        }
        if self.backoff_multiplier < 1.0 {
            return Err("retry.backoff_multiplier must be >= 1.0".to_string());
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err("retry.initial_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local_enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_database_path() -> String {
    "./home-assistant_v2.db".to_string()
}

fn default_influx_url() -> String {
    "http://localhost:8086".to_string()
}

fn default_bucket_recent() -> String {
    "homeassistant-recent".to_string()
}

fn default_bucket_historical() -> String {
    "homeassistant-historical".to_string()
}

fn default_recent_retention_days() -> u32 {
    90
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_batch_size() -> usize {
    1000
}

fn default_progress_interval() -> usize {
    10
}

fn default_checkpoint_file() -> String {
    "./export_checkpoint.json".to_string()
}

fn default_min_year() -> i32 {
    2020
}

fn default_max_year() -> i32 {
    2030
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_include_units() -> Vec<String> {
    to_strings(&[
        "kWh", "W", "°C", "°F", "kB/s", "GB", "MB", "A", "V", "hPa", "bar", "mbar", "lux", "ppm",
        "dB", "rpm",
    ])
}

fn default_include_sources() -> Vec<String> {
    to_strings(&["tibber"])
}

fn default_exclude_patterns() -> Vec<String> {
    to_strings(&["%availability%", "%status%", "%signal%", "%connected%"])
}

fn default_include_domains() -> Vec<String> {
    to_strings(&["sensor", "counter", "weather", "climate", "utility_meter"])
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
