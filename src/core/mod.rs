//! Core business logic for Hastats.
//!
//! # Modules
//!
//! - [`classify`] - Entity classification and admission
//! - [`quality`] - Per-value validation and issue tracking
//! - [`export`] - Export orchestration, batch processing, and coordination
//! - [`state`] - Checkpoints for resumable exports
//!
//! # Export Workflow
//!
//! 1. **Classify**: Read `statistics_meta` and admit exportable entities
//! 2. **Resume**: Load the checkpoint and drop entities already completed
//! 3. **Page**: Read each statistics table with a monotonic cursor
//! 4. **Validate**: Deduplicate, check timestamps, clean each value field
//! 5. **Write**: Encode points and write them to the table's bucket
//! 6. **Checkpoint**: Save progress after every batch
//! 7. **Report**: Generate the export summary and issue report
//!
//! # Example
//!
//! ```rust,no_run
//! use hastats::config::load_config;
//! use hastats::core::export::{ExportCoordinator, ExportOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hastats.toml")?;
//!
//! // Create shutdown signal
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let coordinator =
//!     ExportCoordinator::from_config(config, ExportOptions::default(), shutdown_rx).await?;
//! let summary = coordinator.execute_export().await?;
//!
//! println!("Records read: {}", summary.records_read());
//! println!("Points written: {}", summary.points_written());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod export;
pub mod quality;
pub mod state;
