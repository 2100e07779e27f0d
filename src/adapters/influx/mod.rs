//! InfluxDB 2 destination
//!
//! - [`traits`] - [`PointWriter`], [`PointReader`] and [`BucketAdmin`]
//! - [`client`] - reqwest-based [`InfluxClient`] implementing all three
//! - [`point`] - [`Point`] and line-protocol encoding
//! - [`queries`] - Flux used by the inspection commands

pub mod client;
pub mod point;
pub mod queries;
pub mod traits;

pub use client::{parse_flux_csv, InfluxClient};
pub use point::{encode_batch, Point, MIGRATION_SOURCE};
pub use queries::{bucket_stats, count_query, sample_query, BucketStats};
pub use traits::{BucketAdmin, PointReader, PointWriter, QueryRow, WriteOutcome};
