//! Destination abstraction traits
//!
//! The exporter only needs [`PointWriter`] and [`PointReader`]; the bucket
//! administration commands additionally use [`BucketAdmin`].

use super::point::Point;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// One row of a Flux query result, keyed by column name.
pub type QueryRow = BTreeMap<String, String>;

/// Result of a write operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    /// Points accepted by the destination
    pub written: usize,

    /// Points that were left out of the request, with the reason
    pub errors: Vec<String>,
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Writes points into a bucket
///
/// Writes must be idempotent: the same measurement, tag set and timestamp
/// overwrite the earlier value.
#[async_trait]
pub trait PointWriter: Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the request as a whole fails. Transient failures
    /// are reported as retryable errors; the caller owns the retry loop.
    async fn write(&self, bucket: &str, points: &[Point]) -> Result<WriteOutcome>;
}

/// Reads from the destination
#[async_trait]
pub trait PointReader: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    /// Runs a Flux query and returns every row of every result table.
    async fn query(&self, flux: &str) -> Result<Vec<QueryRow>>;
}

/// Bucket lifecycle operations used by `setup` and `cleanup`
#[async_trait]
pub trait BucketAdmin: Send + Sync {
    /// Creates the bucket unless it already exists. Returns `true` when a
    /// bucket was created. `retention` of `None` keeps data forever.
    async fn create_bucket(
        &self,
        name: &str,
        retention: Option<Duration>,
        description: &str,
    ) -> Result<bool>;

    /// Deletes every point tagged `source="migration"` from the bucket.
    async fn delete_migration_data(&self, bucket: &str) -> Result<()>;
}
