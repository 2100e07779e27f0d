//! Configuration management for Hastats.
//!
//! Hastats uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `HASTATS_<SECTION>_<KEY>` environment overrides
//! - Default values for everything except the InfluxDB credentials
//! - Validation before any I/O happens
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hastats::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hastats.toml")?;
//!
//! println!("Source: {}", config.source.database_path);
//! println!("InfluxDB: {} ({})", config.influxdb.url, config.influxdb.org);
//! println!("Batch size: {}", config.export.batch_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! database_path = "/config/home-assistant_v2.db"
//!
//! [influxdb]
//! url = "http://localhost:8086"
//! token = "${INFLUXDB_TOKEN}"
//! org = "home"
//!
//! [export]
//! batch_size = 1000
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, ExportConfig, FilterConfig, HastatsConfig, InfluxConfig, LoggingConfig,
    QualityConfig, RetryConfig, SourceConfig, UnitRange,
};
pub use secret::{masked, secret_string, token_header, SecretString, SecretValue};
