//! Record source abstraction
//!
//! This module defines the trait a statistics source must implement to feed
//! the exporter.

use crate::domain::{EntityMetadata, EntitySummary, RecordCursor, RecordPage, Result, StatTable};
use async_trait::async_trait;

/// Largest id list bound as SQL parameters in one statement.
pub const MAX_SQL_PARAMS: usize = 999;

/// Read-only access to Home Assistant statistics
///
/// Pages are ordered by `(metadata_id, start_ts)` and continue strictly after
/// the given cursor, so concurrent inserts into the source never shift a page
/// boundary.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// All statistic metadata, ordered by statistic id. Entities whose state
    /// class is `timestamp` are omitted.
    async fn list_entity_metadata(&self) -> Result<Vec<EntityMetadata>>;

    /// Number of rows in `table` belonging to `entity_ids`. An empty id list
    /// counts the whole table.
    async fn count(&self, table: StatTable, entity_ids: &[i64]) -> Result<u64>;

    /// Up to `limit` rows after `cursor` belonging to `entity_ids`.
    ///
    /// `next` is `None` once the table is exhausted. A page may hold fewer than
    /// `limit` rows (even none) and still have a `next` cursor when the source
    /// filters ids after reading.
    async fn page_records(
        &self,
        table: StatTable,
        entity_ids: &[i64],
        cursor: RecordCursor,
        limit: usize,
    ) -> Result<RecordPage>;

    /// Entity counts by unit and source plus per-table record totals.
    async fn entity_summary(&self) -> Result<EntitySummary>;

    /// Human-readable location for log and CLI output.
    fn describe(&self) -> String;
}
