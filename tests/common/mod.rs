//! Shared fixtures for the integration tests: an in-memory statistics
//! source, an in-memory InfluxDB and a small recorder database on disk.

#![allow(dead_code)]

use async_trait::async_trait;
use hastats::adapters::influx::{Point, PointReader, PointWriter, QueryRow, WriteOutcome};
use hastats::adapters::source::RecordSource;
use hastats::config::HastatsConfig;
use hastats::core::export::{ExportCoordinator, ExportOptions};
use hastats::core::state::CheckpointManager;
use hastats::domain::{
    EntityMetadata, EntitySummary, InfluxError, RecordCursor, RecordPage, Result, StatTable,
    StatisticRecord,
};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::watch;

/// 2023-11-14T22:13:20Z
pub const TS: f64 = 1_700_000_000.0;

pub fn entity(id: i64, statistic_id: &str, unit: &str) -> EntityMetadata {
    EntityMetadata::builder()
        .id(id)
        .statistic_id(statistic_id)
        .unit(unit)
        .has_mean(true)
        .build()
        .unwrap()
}

/// A row carrying only `mean`.
pub fn mean_record(id: i64, metadata_id: i64, start_ts: f64, mean: f64) -> StatisticRecord {
    StatisticRecord {
        id,
        metadata_id,
        created_ts: start_ts + 300.0,
        start_ts,
        value: None,
        mean: Some(mean),
        min: None,
        max: None,
        sum: None,
        last_reset_ts: None,
    }
}

/// A row carrying only `value` (the recorder's `state` column).
pub fn value_record(id: i64, metadata_id: i64, start_ts: f64, value: f64) -> StatisticRecord {
    StatisticRecord {
        value: Some(value),
        mean: None,
        ..mean_record(id, metadata_id, start_ts, 0.0)
    }
}

/// Statistics source backed by two vectors, paged like the SQLite reader.
#[derive(Default)]
pub struct MemorySource {
    pub metadata: Vec<EntityMetadata>,
    pub short_term: Vec<StatisticRecord>,
    pub long_term: Vec<StatisticRecord>,
    requested: Mutex<BTreeSet<i64>>,
    pages: AtomicUsize,
}

impl MemorySource {
    pub fn new(metadata: Vec<EntityMetadata>) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    pub fn with_short_term(mut self, records: Vec<StatisticRecord>) -> Self {
        self.short_term = records;
        self
    }

    pub fn with_long_term(mut self, records: Vec<StatisticRecord>) -> Self {
        self.long_term = records;
        self
    }

    /// Every metadata id that was ever asked for in a count or page request.
    pub fn requested_ids(&self) -> BTreeSet<i64> {
        self.requested.lock().unwrap().clone()
    }

    pub fn page_requests(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    fn rows(&self, table: StatTable) -> Vec<StatisticRecord> {
        let mut rows = match table {
            StatTable::ShortTerm => self.short_term.clone(),
            StatTable::LongTerm => self.long_term.clone(),
        };
        rows.sort_by(|a, b| {
            (a.metadata_id, a.start_ts, a.id)
                .partial_cmp(&(b.metadata_id, b.start_ts, b.id))
                .unwrap()
        });
        rows
    }

    fn note(&self, ids: &[i64]) {
        self.requested.lock().unwrap().extend(ids.iter().copied());
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn list_entity_metadata(&self) -> Result<Vec<EntityMetadata>> {
        Ok(self.metadata.clone())
    }

    async fn count(&self, table: StatTable, ids: &[i64]) -> Result<u64> {
        self.note(ids);
        Ok(self
            .rows(table)
            .iter()
            .filter(|r| ids.is_empty() || ids.contains(&r.metadata_id))
            .count() as u64)
    }

    async fn page_records(
        &self,
        table: StatTable,
        ids: &[i64],
        cursor: RecordCursor,
        limit: usize,
    ) -> Result<RecordPage> {
        self.note(ids);
        self.pages.fetch_add(1, Ordering::SeqCst);

        let records: Vec<StatisticRecord> = self
            .rows(table)
            .into_iter()
            .filter(|r| ids.is_empty() || ids.contains(&r.metadata_id))
            .filter(|r| cursor.precedes(r))
            .take(limit)
            .collect();
        let next = if records.len() == limit {
            records.last().map(StatisticRecord::cursor)
        } else {
            None
        };
        Ok(RecordPage { records, next })
    }

    async fn entity_summary(&self) -> Result<EntitySummary> {
        Ok(EntitySummary {
            total_entities: self.metadata.len() as u64,
            short_term_records: self.short_term.len() as u64,
            long_term_records: self.long_term.len() as u64,
            ..EntitySummary::default()
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// InfluxDB stand-in that keeps every written point.
///
/// Can be told to start failing after a number of successful writes, or to
/// raise the shutdown flag once a number of writes went through.
#[derive(Default)]
pub struct MemoryInflux {
    written: Mutex<Vec<(String, Point)>>,
    missing_buckets: BTreeSet<String>,
    fail_after: Option<usize>,
    shutdown_after: Option<(usize, watch::Sender<bool>)>,
    writes: AtomicUsize,
}

impl MemoryInflux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_bucket(mut self, bucket: &str) -> Self {
        self.missing_buckets.insert(bucket.to_string());
        self
    }

    /// Every write after the first `successful` ones is rejected.
    pub fn failing_after(mut self, successful: usize) -> Self {
        self.fail_after = Some(successful);
        self
    }

    /// Sends `true` on `shutdown` once `writes` writes have succeeded.
    pub fn shutdown_after(mut self, writes: usize, shutdown: watch::Sender<bool>) -> Self {
        self.shutdown_after = Some((writes, shutdown));
        self
    }

    pub fn points(&self) -> Vec<(String, Point)> {
        self.written.lock().unwrap().clone()
    }

    pub fn points_in(&self, bucket: &str) -> Vec<Point> {
        self.points()
            .into_iter()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p)
            .collect()
    }

    /// Distinct `(entity_id, timestamp)` pairs written to `bucket`.
    pub fn series_keys(&self, bucket: &str) -> BTreeSet<(String, i64)> {
        self.points_in(bucket)
            .into_iter()
            .map(|p| (p.tags["entity_id"].clone(), p.timestamp))
            .collect()
    }
}

#[async_trait]
impl PointWriter for MemoryInflux {
    async fn write(&self, bucket: &str, points: &[Point]) -> Result<WriteOutcome> {
        let done = self.writes.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| done >= limit) {
            return Err(InfluxError::ClientError {
                status: 400,
                message: "partial write: field type conflict".to_string(),
            }
            .into());
        }

        self.written
            .lock()
            .unwrap()
            .extend(points.iter().map(|p| (bucket.to_string(), p.clone())));
        let done = self.writes.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((after, shutdown)) = &self.shutdown_after {
            if done >= *after {
                let _ = shutdown.send(true);
            }
        }

        Ok(WriteOutcome {
            written: points.len(),
            errors: Vec::new(),
        })
    }
}

#[async_trait]
impl PointReader for MemoryInflux {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(!self.missing_buckets.contains(bucket))
    }

    async fn query(&self, _flux: &str) -> Result<Vec<QueryRow>> {
        Ok(Vec::new())
    }
}

/// Parsed (not validated) configuration with a checkpoint file inside `dir`,
/// small batches and no retry delays.
pub fn test_config(dir: &Path) -> HastatsConfig {
    let checkpoint = dir.join("export_checkpoint.json");
    let toml = format!(
        r#"
[source]
database_path = "{db}"

[influxdb]
url = "http://localhost:8086"
token = "test-token"
org = "home"

[export]
batch_size = 2
checkpoint_file = "{checkpoint}"

[retry]
max_retries = 0
initial_delay_ms = 1
max_delay_ms = 1
"#,
        db = dir.join("home-assistant_v2.db").display(),
        checkpoint = checkpoint.display(),
    );
    toml::from_str(&toml).unwrap()
}

pub fn checkpoint_path(config: &HastatsConfig) -> PathBuf {
    PathBuf::from(&config.export.checkpoint_file)
}

pub fn coordinator(
    config: &HastatsConfig,
    options: ExportOptions,
    source: Arc<MemorySource>,
    influx: Arc<MemoryInflux>,
    shutdown: watch::Receiver<bool>,
) -> ExportCoordinator {
    ExportCoordinator::new(
        config.clone(),
        options,
        source,
        influx.clone(),
        influx,
        CheckpointManager::from_path(&config.export.checkpoint_file),
        shutdown,
    )
}

/// A shutdown receiver whose sender is already gone, so it never fires.
pub fn no_shutdown() -> watch::Receiver<bool> {
    watch::channel(false).1
}

const SCHEMA: &str = "
    CREATE TABLE statistics_meta (
        id INTEGER PRIMARY KEY, statistic_id VARCHAR(255), source VARCHAR(32),
        unit_of_measurement VARCHAR(255), has_mean BOOLEAN, has_sum BOOLEAN,
        name VARCHAR(255));
    CREATE TABLE statistics (
        id INTEGER PRIMARY KEY, created_ts FLOAT, metadata_id INTEGER, start_ts FLOAT,
        mean FLOAT, min FLOAT, max FLOAT, last_reset_ts FLOAT, state FLOAT, sum FLOAT);
    CREATE TABLE statistics_short_term (
        id INTEGER PRIMARY KEY, created_ts FLOAT, metadata_id INTEGER, start_ts FLOAT,
        mean FLOAT, min FLOAT, max FLOAT, last_reset_ts FLOAT, state FLOAT, sum FLOAT);";

/// Writes a recorder database with three exportable entities and one
/// status sensor into `dir/home-assistant_v2.db`.
///
/// | id | statistic_id                     | unit | short-term | long-term |
/// |----|----------------------------------|------|------------|-----------|
/// | 1  | sensor.living_room_temperature   | °C   | 3          | 4         |
/// | 2  | sensor.house_energy              | kWh  | 0          | 3         |
/// | 3  | sensor.grid_power                | W    | 2          | 2         |
/// | 4  | sensor.router_status             | %    | 1          | 1         |
pub fn create_recorder_database(dir: &Path) -> PathBuf {
    let path = dir.join("home-assistant_v2.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(
        "INSERT INTO statistics_meta VALUES
            (1, 'sensor.living_room_temperature', 'recorder', '°C', 1, 0, NULL),
            (2, 'sensor.house_energy', 'recorder', 'kWh', 0, 1, NULL),
            (3, 'sensor.grid_power', 'recorder', 'W', 1, 0, NULL),
            (4, 'sensor.router_status', 'recorder', '%', 1, 0, NULL);",
    )
    .unwrap();

    let rows: HashMap<&str, Vec<(i64, usize)>> = HashMap::from([
        ("statistics_short_term", vec![(1, 3), (3, 2), (4, 1)]),
        ("statistics", vec![(1, 4), (2, 3), (3, 2), (4, 1)]),
    ]);
    for (table, per_entity) in rows {
        let step = if table == "statistics" { 3600.0 } else { 300.0 };
        let sql = format!(
            "INSERT INTO {table} (created_ts, metadata_id, start_ts, mean, state, sum)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
        for (metadata_id, count) in per_entity {
            for n in 0..count {
                let start = TS + step * n as f64;
                let (mean, state, sum): (Option<f64>, Option<f64>, Option<f64>) = match metadata_id
                {
                    2 => (None, Some(1200.0 + n as f64), Some(10.0 * n as f64)),
                    3 => (Some(400.0 + n as f64), None, None),
                    _ => (Some(20.0 + n as f64 / 10.0), None, None),
                };
                conn.execute(
                    &sql,
                    rusqlite::params![start + step, metadata_id, start, mean, state, sum],
                )
                .unwrap();
            }
        }
    }
    path
}

/// Scratch directory holding a recorder database and a config pointing at it.
pub struct RecorderFixture {
    pub dir: TempDir,
    pub config: HastatsConfig,
}

impl RecorderFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        create_recorder_database(dir.path());
        let config = test_config(dir.path());
        Self { dir, config }
    }
}
