//! Export checkpoint model
//!
//! The checkpoint is the only state shared between runs. It records which
//! entities and tables are finished, where each unfinished table's cursor
//! stands, and the configuration that produced it.

use crate::config::HastatsConfig;
use crate::domain::{RecordCursor, StatTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Run status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// Created, no batch written yet
    #[default]
    Fresh,
    InProgress,
    Completed,
    Failed,
}

/// The configuration values that change what a run exports or where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub batch_size: usize,
    pub bucket_recent: String,
    pub bucket_historical: String,
    pub include_units: Vec<String>,
    pub include_domains: Vec<String>,
    pub include_sources: Vec<String>,
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub entity_pattern: Option<String>,
}

impl ConfigSnapshot {
    pub fn from_config(config: &HastatsConfig, entity_pattern: Option<&str>) -> Self {
        Self {
            batch_size: config.export.batch_size,
            bucket_recent: config.influxdb.bucket_recent.clone(),
            bucket_historical: config.influxdb.bucket_historical.clone(),
            include_units: config.filter.include_units.clone(),
            include_domains: config.filter.include_domains.clone(),
            include_sources: config.filter.include_sources.clone(),
            exclude_patterns: config.filter.exclude_patterns.clone(),
            entity_pattern: entity_pattern.map(str::to_string),
        }
    }

    /// Names of the settings that differ, empty when the snapshots match.
    pub fn diff(&self, other: &ConfigSnapshot) -> Vec<String> {
        let mut changed = Vec::new();
        if self.batch_size != other.batch_size {
            changed.push(format!(
                "batch_size ({} -> {})",
                self.batch_size, other.batch_size
            ));
        }
        if self.bucket_recent != other.bucket_recent {
            changed.push(format!(
                "bucket_recent ({} -> {})",
                self.bucket_recent, other.bucket_recent
            ));
        }
        if self.bucket_historical != other.bucket_historical {
            changed.push(format!(
                "bucket_historical ({} -> {})",
                self.bucket_historical, other.bucket_historical
            ));
        }
        for (name, a, b) in [
            ("include_units", &self.include_units, &other.include_units),
            ("include_domains", &self.include_domains, &other.include_domains),
            ("include_sources", &self.include_sources, &other.include_sources),
            ("exclude_patterns", &self.exclude_patterns, &other.exclude_patterns),
        ] {
            if as_set(a) != as_set(b) {
                changed.push(name.to_string());
            }
        }
        if self.entity_pattern != other.entity_pattern {
            changed.push(format!(
                "entity filter ({} -> {})",
                self.entity_pattern.as_deref().unwrap_or("none"),
                other.entity_pattern.as_deref().unwrap_or("none")
            ));
        }
        changed
    }
}

fn as_set(values: &[String]) -> BTreeSet<&str> {
    values.iter().map(String::as_str).collect()
}

/// Durable progress of one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportCheckpoint {
    /// `%Y%m%d_%H%M%S` of the run start
    pub export_id: String,
    pub status: CheckpointStatus,
    pub start_time: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub total_entities: usize,
    pub entities_completed: usize,
    pub short_term_records_processed: u64,
    pub long_term_records_processed: u64,
    pub total_points_written: u64,
    pub current_table: Option<StatTable>,
    #[serde(default)]
    pub completed_tables: Vec<StatTable>,
    /// Last cursor written per table, keyed by table name
    #[serde(default)]
    pub cursors: BTreeMap<String, RecordCursor>,
    pub completed_metadata_ids: BTreeSet<i64>,
    pub failed_metadata_ids: BTreeSet<i64>,
    pub export_config: ConfigSnapshot,
}

impl ExportCheckpoint {
    pub fn new(export_id: impl Into<String>, total_entities: usize, config: ConfigSnapshot) -> Self {
        let now = Utc::now();
        Self {
            export_id: export_id.into(),
            status: CheckpointStatus::Fresh,
            start_time: now,
            last_update: now,
            total_entities,
            entities_completed: 0,
            short_term_records_processed: 0,
            long_term_records_processed: 0,
            total_points_written: 0,
            current_table: None,
            completed_tables: Vec::new(),
            cursors: BTreeMap::new(),
            completed_metadata_ids: BTreeSet::new(),
            failed_metadata_ids: BTreeSet::new(),
            export_config: config,
        }
    }

    /// Export id derived from a start time.
    pub fn export_id_for(time: DateTime<Utc>) -> String {
        time.format("%Y%m%d_%H%M%S").to_string()
    }

    pub fn mark_started(&mut self) {
        self.status = CheckpointStatus::InProgress;
        self.touch();
    }

    pub fn mark_completed(&mut self) {
        self.status = CheckpointStatus::Completed;
        self.current_table = None;
        self.touch();
    }

    pub fn mark_failed(&mut self) {
        self.status = CheckpointStatus::Failed;
        self.touch();
    }

    pub fn is_resumable(&self) -> bool {
        matches!(
            self.status,
            CheckpointStatus::Fresh | CheckpointStatus::InProgress | CheckpointStatus::Failed
        )
    }

    /// Records an entity as fully exported. Removes it from the failed set.
    pub fn mark_entity_done(&mut self, metadata_id: i64) {
        self.failed_metadata_ids.remove(&metadata_id);
        if self.completed_metadata_ids.insert(metadata_id) {
            self.entities_completed = self.completed_metadata_ids.len();
        }
        self.touch();
    }

    /// Records an entity whose points could not be written. Ignored for
    /// entities already completed.
    pub fn mark_entity_failed(&mut self, metadata_id: i64) {
        if !self.completed_metadata_ids.contains(&metadata_id) {
            self.failed_metadata_ids.insert(metadata_id);
        }
        self.touch();
    }

    pub fn is_entity_done(&self, metadata_id: i64) -> bool {
        self.completed_metadata_ids.contains(&metadata_id)
    }

    pub fn is_table_done(&self, table: StatTable) -> bool {
        self.completed_tables.contains(&table)
    }

    pub fn cursor(&self, table: StatTable) -> Option<RecordCursor> {
        self.cursors.get(table.table_name()).copied()
    }

    /// Advances the table's cursor and counters after a written batch.
    pub fn record_batch(
        &mut self,
        table: StatTable,
        cursor: RecordCursor,
        records_processed: u64,
        points_written: u64,
    ) {
        self.current_table = Some(table);
        self.cursors.insert(table.table_name().to_string(), cursor);
        match table {
            StatTable::ShortTerm => self.short_term_records_processed += records_processed,
            StatTable::LongTerm => self.long_term_records_processed += records_processed,
        }
        self.total_points_written += points_written;
        self.touch();
    }

    pub fn mark_table_done(&mut self, table: StatTable) {
        if !self.completed_tables.contains(&table) {
            self.completed_tables.push(table);
        }
        self.cursors.remove(table.table_name());
        self.touch();
    }

    pub fn records_processed(&self) -> u64 {
        self.short_term_records_processed + self.long_term_records_processed
    }

    fn touch(&mut self) {
        self.last_update = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            batch_size: 1000,
            bucket_recent: "recent".to_string(),
            bucket_historical: "historical".to_string(),
            include_units: vec!["kWh".to_string(), "W".to_string()],
            include_domains: vec!["sensor".to_string()],
            include_sources: vec!["tibber".to_string()],
            exclude_patterns: vec!["%status%".to_string()],
            entity_pattern: None,
        }
    }

    #[test]
    fn test_export_id_format() {
        let time = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ExportCheckpoint::export_id_for(time), "20240305_070809");
    }

    #[test]
    fn test_status_transitions() {
        let mut cp = ExportCheckpoint::new("run", 3, snapshot());
        assert_eq!(cp.status, CheckpointStatus::Fresh);
        cp.mark_started();
        assert_eq!(cp.status, CheckpointStatus::InProgress);
        assert!(cp.is_resumable());
        cp.mark_completed();
        assert_eq!(cp.status, CheckpointStatus::Completed);
        assert!(!cp.is_resumable());
    }

    #[test]
    fn test_done_and_failed_sets_stay_disjoint() {
        let mut cp = ExportCheckpoint::new("run", 3, snapshot());
        cp.mark_entity_failed(7);
        assert!(cp.failed_metadata_ids.contains(&7));

        cp.mark_entity_done(7);
        assert!(cp.is_entity_done(7));
        assert!(!cp.failed_metadata_ids.contains(&7));

        cp.mark_entity_failed(7);
        assert!(!cp.failed_metadata_ids.contains(&7));
        assert_eq!(cp.entities_completed, 1);
    }

    #[test]
    fn test_record_batch_and_table_done() {
        let mut cp = ExportCheckpoint::new("run", 3, snapshot());
        let cursor = RecordCursor {
            metadata_id: 4,
            start_ts: 1_700_000_000.0,
            id: 12,
        };
        cp.record_batch(StatTable::ShortTerm, cursor, 100, 95);
        cp.record_batch(StatTable::ShortTerm, cursor, 50, 50);

        assert_eq!(cp.short_term_records_processed, 150);
        assert_eq!(cp.total_points_written, 145);
        assert_eq!(cp.cursor(StatTable::ShortTerm), Some(cursor));
        assert_eq!(cp.current_table, Some(StatTable::ShortTerm));

        cp.mark_table_done(StatTable::ShortTerm);
        assert!(cp.is_table_done(StatTable::ShortTerm));
        assert_eq!(cp.cursor(StatTable::ShortTerm), None);
        assert!(!cp.is_table_done(StatTable::LongTerm));
    }

    #[test]
    fn test_snapshot_diff() {
        let a = snapshot();
        assert!(a.diff(&a.clone()).is_empty());

        let mut b = snapshot();
        b.batch_size = 500;
        b.include_units.reverse();
        b.bucket_recent = "other".to_string();
        let changes = a.diff(&b);
        assert_eq!(changes.len(), 2);
        assert!(changes[0].starts_with("batch_size"));
        assert!(changes[1].starts_with("bucket_recent"));

        let mut c = snapshot();
        c.entity_pattern = Some("energy".to_string());
        assert_eq!(a.diff(&c), vec!["entity filter (none -> energy)".to_string()]);
    }
}
