//! Batch validation of statistic records
//!
//! The [`BatchProcessor`] turns one page of raw rows into records ready for the
//! point writer. Per record it:
//! 1. Skips rows whose entity was not admitted
//! 2. Drops duplicates of `(metadata_id, start_ts)` seen earlier in the table
//! 3. Drops rows whose start lies outside the configured year window
//! 4. Validates each numeric field, applying corrections or nulling the field
//! 5. Drops the row if no field survives
//!
//! The dedup set lives only in memory and is cleared at table boundaries with
//! [`BatchProcessor::reset_table`]. Resumed runs start with an empty set and rely
//! on InfluxDB overwriting identical series/timestamp pairs.

use crate::core::classify::FilteredEntity;
use crate::core::quality::{IssueTracker, QualityValidator};
use crate::domain::{HastatsError, RecordField, Result, StatisticRecord};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Admitted entities keyed by `statistics_meta.id`.
pub type EntityLookup = HashMap<i64, FilteredEntity>;

/// Accepted `start_ts` range, `[start, end]` in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    /// January 1st of `min_year` to January 1st of `max_year`, both inclusive, UTC.
    pub fn from_years(min_year: i32, max_year: i32) -> Result<Self> {
        let start = year_start(min_year)?;
        let end = year_start(max_year)?;
        if start >= end {
            return Err(HastatsError::Configuration(format!(
                "Invalid timestamp window: {min_year}..{max_year}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: f64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

fn year_start(year: i32) -> Result<f64> {
    let naive = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| HastatsError::Configuration(format!("Invalid year: {year}")))?;
    Ok(Utc.from_utc_datetime(&naive).timestamp() as f64)
}

/// A record that survived validation, paired with its owning entity.
#[derive(Debug, Clone)]
pub struct AcceptedRecord<'a> {
    pub record: StatisticRecord,
    pub entity: &'a FilteredEntity,
    pub corrected: bool,
}

/// Counters for one batch or, folded together, a whole run.
///
/// `total = valid + invalid + skipped`. Duplicates and out-of-window rows are
/// counted in `invalid` as well as in their own counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingMetrics {
    pub total: u64,
    pub valid: u64,
    pub invalid: u64,
    pub skipped: u64,
    pub corrected: u64,
    pub duplicates: u64,
    pub out_of_window: u64,
    /// Individual field failures (a record can contribute several)
    pub validation_failures: u64,
    pub processing_time: Duration,
    pub issues: IssueTracker,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.valid as f64 / self.total as f64 * 100.0
    }

    pub fn merge(&mut self, other: &ProcessingMetrics) {
        self.total += other.total;
        self.valid += other.valid;
        self.invalid += other.invalid;
        self.skipped += other.skipped;
        self.corrected += other.corrected;
        self.duplicates += other.duplicates;
        self.out_of_window += other.out_of_window;
        self.validation_failures += other.validation_failures;
        self.processing_time += other.processing_time;
        self.issues.merge(&other.issues);
    }

    /// Log the processing statistics
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            valid = self.valid,
            invalid = self.invalid,
            skipped = self.skipped,
            corrected = self.corrected,
            duplicates = self.duplicates,
            validation_failures = self.validation_failures,
            processing_ms = self.processing_time.as_millis() as u64,
            success_rate = %format!("{:.2}%", self.success_rate()),
            "Record processing statistics"
        );
    }
}

/// Validates pages of records against the admitted entity set.
pub struct BatchProcessor {
    validator: QualityValidator,
    window: TimeWindow,
    /// Entity whose start times are in `seen`. Pages arrive ordered by
    /// entity, so earlier entities can never repeat.
    seen_entity: Option<i64>,
    seen: HashSet<u64>,
    totals: ProcessingMetrics,
}

impl BatchProcessor {
    pub fn new(validator: QualityValidator, window: TimeWindow) -> Self {
        Self {
            validator,
            window,
            seen_entity: None,
            seen: HashSet::new(),
            totals: ProcessingMetrics::new(),
        }
    }

    /// Running total across every batch since creation or the last reset.
    pub fn totals(&self) -> &ProcessingMetrics {
        &self.totals
    }

    /// Clears the dedup set. Called between tables.
    pub fn reset_table(&mut self) {
        self.seen_entity = None;
        self.seen.clear();
    }

    /// Clears the dedup set and all accumulated metrics.
    pub fn reset_metrics(&mut self) {
        self.reset_table();
        self.totals = ProcessingMetrics::new();
    }

    /// Process one page of records
    ///
    /// Returns the accepted records and the metrics for this batch; the metrics
    /// are also folded into [`BatchProcessor::totals`].
    pub fn process<'a>(
        &mut self,
        records: Vec<StatisticRecord>,
        lookup: &'a EntityLookup,
    ) -> (Vec<AcceptedRecord<'a>>, ProcessingMetrics) {
        let started = Instant::now();
        let mut metrics = ProcessingMetrics::new();
        let mut accepted = Vec::with_capacity(records.len());

        for record in records {
            metrics.total += 1;

            let Some(entity) = lookup.get(&record.metadata_id) else {
                metrics.skipped += 1;
                continue;
            };

            if self.seen_entity != Some(record.metadata_id) {
                self.seen_entity = Some(record.metadata_id);
                self.seen.clear();
            }
            if !self.seen.insert(record.start_ts.to_bits()) {
                metrics.duplicates += 1;
                metrics.invalid += 1;
                continue;
            }

            if !self.window.contains(record.start_ts) {
                metrics.out_of_window += 1;
                metrics.invalid += 1;
                metrics.issues.record(
                    "Timestamp outside valid range",
                    &entity.metadata.statistic_id,
                );
                continue;
            }

            let (cleaned, corrected) = self.validate_fields(record, entity, &mut metrics);

            if !cleaned.has_any_field() {
                metrics.invalid += 1;
                continue;
            }

            metrics.valid += 1;
            if corrected {
                metrics.corrected += 1;
            }
            accepted.push(AcceptedRecord {
                record: cleaned,
                entity,
                corrected,
            });
        }

        metrics.processing_time = started.elapsed();
        self.totals.merge(&metrics);

        tracing::debug!(
            total = metrics.total,
            valid = metrics.valid,
            invalid = metrics.invalid,
            skipped = metrics.skipped,
            corrected = metrics.corrected,
            "Processed batch"
        );

        (accepted, metrics)
    }

    fn validate_fields(
        &self,
        record: StatisticRecord,
        entity: &FilteredEntity,
        metrics: &mut ProcessingMetrics,
    ) -> (StatisticRecord, bool) {
        let unit = entity.metadata.unit();
        let entity_id = entity.metadata.statistic_id.as_str();
        let mut cleaned = record;
        let mut corrected = false;

        for field in RecordField::ALL {
            let Some(value) = cleaned.field(field) else {
                continue;
            };

            let result = self.validator.validate(value, unit, entity.category);
            if result.is_valid {
                continue;
            }

            metrics.validation_failures += 1;
            for issue in &result.issues {
                metrics.issues.record(issue, entity_id);
            }

            match result.corrected_value {
                Some(fixed) => {
                    cleaned = cleaned.with_field(field, Some(fixed));
                    corrected = true;
                }
                None => {
                    tracing::trace!(
                        entity = entity_id,
                        field = field.name(),
                        value,
                        "Dropping invalid field"
                    );
                    cleaned = cleaned.with_field(field, None);
                }
            }
        }

        (cleaned, corrected)
    }
}
