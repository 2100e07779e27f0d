// Hastats - Home Assistant statistics to InfluxDB exporter
// Copyright (c) 2025 Hastats Contributors
// Licensed under the MIT License

//! # Hastats - Home Assistant statistics to InfluxDB
//!
//! Hastats exports the long-term statistics Home Assistant keeps in its
//! recorder database (`statistics_short_term` and `statistics`) into two
//! InfluxDB 2 buckets, with validation on the way and a checkpoint so an
//! interrupted export continues where it stopped.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Classification, validation, export orchestration, checkpoints
//! - [`adapters`] - SQLite source and InfluxDB destination
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hastats::config::HastatsConfig;
//! use hastats::core::export::{ExportCoordinator, ExportOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HastatsConfig::from_file("hastats.toml")?;
//!     let (_tx, shutdown) = tokio::sync::watch::channel(false);
//!
//!     let coordinator =
//!         ExportCoordinator::from_config(config, ExportOptions::default(), shutdown).await?;
//!     let summary = coordinator.execute_export().await?;
//!
//!     println!("Wrote {} points", summary.points_written());
//!     Ok(())
//! }
//! ```
//!
//! ## Classification
//!
//! Every entity gets exactly one [`domain::SensorCategory`], decided by its
//! statistics source, exclusion patterns and unit:
//!
//! ```rust
//! use hastats::config::FilterConfig;
//! use hastats::core::classify::EntityClassifier;
//! use hastats::domain::{EntityMetadata, SensorCategory};
//!
//! let classifier = EntityClassifier::new(&FilterConfig::default());
//! let meter = EntityMetadata::builder()
//!     .id(1)
//!     .statistic_id("sensor.house_energy")
//!     .unit("kWh")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(classifier.classify(&meter), SensorCategory::Energy);
//! ```
//!
//! ## Validation
//!
//! Each value field is checked on its own. Fixable values are corrected,
//! the rest are nulled, and a record with no fields left is dropped:
//!
//! ```rust
//! use hastats::core::quality::QualityValidator;
//! use hastats::domain::SensorCategory;
//!
//! let validator = QualityValidator::default();
//! let result = validator.validate(104.0, Some("%"), SensorCategory::Percentage);
//!
//! assert!(!result.is_valid);
//! assert_eq!(result.corrected_value, Some(100.0));
//! ```
//!
//! ## Error Handling
//!
//! All fallible library operations return [`domain::Result`]:
//!
//! ```rust,no_run
//! use hastats::domain::HastatsError;
//!
//! fn example() -> Result<(), HastatsError> {
//!     let config = hastats::config::HastatsConfig::from_file("hastats.toml")?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
