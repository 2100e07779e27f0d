//! External system integrations for Hastats.
//!
//! - [`source`] - Home Assistant recorder database (read-only)
//! - [`influx`] - InfluxDB 2 destination
//! - [`factory`] - Builds both from configuration
//!
//! # Design Pattern
//!
//! Both sides sit behind traits ([`source::RecordSource`],
//! [`influx::PointWriter`], [`influx::PointReader`]) so the exporter can be
//! driven by in-memory doubles in tests.
//!
//! ```rust,no_run
//! use hastats::adapters::factory::{create_influx_client, create_source};
//! use hastats::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hastats.toml")?;
//! let source = create_source(&config).await?;
//! let influx = create_influx_client(&config)?;
//!
//! println!("{} -> {}", source.describe(), influx.base_url());
//! # Ok(())
//! # }
//! ```

pub mod factory;
pub mod influx;
pub mod source;
