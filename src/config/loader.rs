//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::HastatsConfig;
use super::secret_string;
use crate::domain::errors::HastatsError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into HastatsConfig
/// 4. Applies environment variable overrides (HASTATS_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use hastats::config::loader::load_config;
///
/// let config = load_config("hastats.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HastatsConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HastatsError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HastatsError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: HastatsConfig = toml::from_str(&contents)
        .map_err(|e| HastatsError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        HastatsError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied through untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| HastatsError::Configuration(format!("Invalid placeholder pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    processed_line = processed_line.replace(&cap[0], &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(HastatsError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            HastatsError::Configuration(format!("Invalid value for {name}: '{val}'"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using HASTATS_* prefix
///
/// Environment variables follow the pattern: HASTATS_<SECTION>_<KEY>
/// For example: HASTATS_INFLUXDB_TOKEN, HASTATS_EXPORT_BATCH_SIZE.
/// List-valued keys take comma-separated values.
fn apply_env_overrides(config: &mut HastatsConfig) -> Result<()> {
    // Application
    if let Ok(val) = std::env::var("HASTATS_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Some(dry_run) = env_parse("HASTATS_APPLICATION_DRY_RUN")? {
        config.application.dry_run = dry_run;
    }

    // Source
    if let Ok(val) = std::env::var("HASTATS_SOURCE_DATABASE_PATH") {
        config.source.database_path = val;
    }

    // InfluxDB
    if let Ok(val) = std::env::var("HASTATS_INFLUXDB_URL") {
        config.influxdb.url = val;
    }
    if let Ok(val) = std::env::var("HASTATS_INFLUXDB_TOKEN") {
        config.influxdb.token = secret_string(val);
    }
    if let Ok(val) = std::env::var("HASTATS_INFLUXDB_ORG") {
        config.influxdb.org = val;
    }
    if let Ok(val) = std::env::var("HASTATS_INFLUXDB_BUCKET_RECENT") {
        config.influxdb.bucket_recent = val;
    }
    if let Ok(val) = std::env::var("HASTATS_INFLUXDB_BUCKET_HISTORICAL") {
        config.influxdb.bucket_historical = val;
    }
    if let Some(timeout) = env_parse("HASTATS_INFLUXDB_TIMEOUT_SECONDS")? {
        config.influxdb.timeout_seconds = timeout;
    }
    if let Some(verify) = env_parse("HASTATS_INFLUXDB_TLS_VERIFY")? {
        config.influxdb.tls_verify = verify;
    }

    // Export
    if let Some(size) = env_parse("HASTATS_EXPORT_BATCH_SIZE")? {
        config.export.batch_size = size;
    }
    if let Some(interval) = env_parse("HASTATS_EXPORT_PROGRESS_INTERVAL")? {
        config.export.progress_interval = interval;
    }
    if let Some(resume) = env_parse("HASTATS_EXPORT_RESUME_ENABLED")? {
        config.export.resume_enabled = resume;
    }
    if let Ok(val) = std::env::var("HASTATS_EXPORT_CHECKPOINT_FILE") {
        config.export.checkpoint_file = val;
    }

    // Filter
    if let Ok(val) = std::env::var("HASTATS_FILTER_INCLUDE_UNITS") {
        config.filter.include_units = env_list(&val);
    }
    if let Ok(val) = std::env::var("HASTATS_FILTER_INCLUDE_SOURCES") {
        config.filter.include_sources = env_list(&val);
    }
    if let Ok(val) = std::env::var("HASTATS_FILTER_EXCLUDE_PATTERNS") {
        config.filter.exclude_patterns = env_list(&val);
    }
    if let Ok(val) = std::env::var("HASTATS_FILTER_INCLUDE_DOMAINS") {
        config.filter.include_domains = env_list(&val);
    }

    // Retry
    if let Some(retries) = env_parse("HASTATS_RETRY_MAX_RETRIES")? {
        config.retry.max_retries = retries;
    }

    // Logging
    if let Some(enabled) = env_parse("HASTATS_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = enabled;
    }
    if let Ok(val) = std::env::var("HASTATS_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
