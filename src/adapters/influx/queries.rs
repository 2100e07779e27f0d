//! Flux queries used by the `query` and `bucket-stats` commands

use super::traits::{PointReader, QueryRow};
use crate::domain::Result;
use serde::Serialize;

/// Start of the "all time" range.
const EPOCH: &str = "1970-01-01T00:00:00Z";

fn flux_string(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Sample rows from a bucket, optionally for one entity.
///
/// `entity` may be a full statistic id (`sensor.power`) or just the object id
/// stored in the `entity_id` tag.
pub fn sample_query(bucket: &str, entity: Option<&str>, days: u32, limit: usize) -> String {
    let mut flux = format!(
        "from(bucket: {})\n  |> range(start: -{days}d)\n",
        flux_string(bucket)
    );
    if let Some(entity) = entity {
        let object_id = entity.split_once('.').map(|(_, id)| id).unwrap_or(entity);
        flux.push_str(&format!(
            "  |> filter(fn: (r) => r[\"entity_id\"] == {})\n",
            flux_string(object_id)
        ));
    }
    flux.push_str("  |> filter(fn: (r) => r[\"_field\"] == \"value\")\n");
    flux.push_str(&format!("  |> limit(n: {limit})"));
    flux
}

/// Total point count since `start` (a Flux duration or RFC 3339 time).
pub fn count_query(bucket: &str, start: &str) -> String {
    format!(
        "from(bucket: {})\n  |> range(start: {start})\n  |> group()\n  |> count()",
        flux_string(bucket)
    )
}

fn edge_query(bucket: &str, selector: &str) -> String {
    format!(
        "from(bucket: {})\n  |> range(start: {EPOCH})\n  |> group()\n  |> {selector}()",
        flux_string(bucket)
    )
}

fn measurements_query(bucket: &str) -> String {
    format!(
        "import \"influxdata/influxdb/schema\"\nschema.measurements(bucket: {})",
        flux_string(bucket)
    )
}

/// What `bucket-stats` reports per bucket
#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketStats {
    pub bucket: String,
    pub exists: bool,
    pub points_last_30_days: u64,
    pub points_all_time: u64,
    pub measurements: Vec<String>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

fn first_value(rows: &[QueryRow], column: &str) -> Option<String> {
    rows.first().and_then(|row| row.get(column)).cloned()
}

fn count_of(rows: &[QueryRow]) -> u64 {
    rows.iter()
        .filter_map(|row| row.get("_value"))
        .filter_map(|v| v.parse::<u64>().ok())
        .sum()
}

/// Collects [`BucketStats`]. A missing bucket yields `exists: false` and no
/// further queries.
pub async fn bucket_stats(reader: &dyn PointReader, bucket: &str) -> Result<BucketStats> {
    let mut stats = BucketStats {
        bucket: bucket.to_string(),
        ..BucketStats::default()
    };

    if !reader.bucket_exists(bucket).await? {
        return Ok(stats);
    }
    stats.exists = true;

    stats.points_last_30_days = count_of(&reader.query(&count_query(bucket, "-30d")).await?);
    stats.points_all_time = count_of(&reader.query(&count_query(bucket, EPOCH)).await?);

    stats.measurements = reader
        .query(&measurements_query(bucket))
        .await?
        .into_iter()
        .filter_map(|mut row| row.remove("_value"))
        .collect();

    if stats.points_all_time > 0 {
        stats.earliest = first_value(&reader.query(&edge_query(bucket, "first")).await?, "_time");
        stats.latest = first_value(&reader.query(&edge_query(bucket, "last")).await?, "_time");
    }

    Ok(stats)
}
