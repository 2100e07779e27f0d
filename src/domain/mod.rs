//! Domain models and types for Hastats.
//!
//! The domain layer provides:
//! - **Source models** ([`EntityMetadata`], [`StatisticRecord`], [`StatTable`])
//! - **Classification types** ([`SensorCategory`], [`AggregationPolicy`])
//! - **Error types** ([`HastatsError`], [`SourceError`], [`InfluxError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, HastatsError>`]:
//!
//! ```rust
//! use hastats::domain::{HastatsError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = hastats::config::HastatsConfig::from_file("hastats.toml")?;
//!     Ok(())
//! }
//! ```

pub mod category;
pub mod entity;
pub mod errors;
pub mod record;
pub mod result;

pub use category::{AggregationFunction, AggregationPolicy, SensorCategory};
pub use entity::{EntityMetadata, EntityMetadataBuilder, EntitySummary};
pub use errors::{HastatsError, InfluxError, SourceError};
pub use record::{RecordCursor, RecordField, RecordPage, StatTable, StatisticRecord};
pub use result::Result;
