//! Export coordinator - main orchestrator for the export process
//!
//! Runs one export:
//!
//! 1. Load entity metadata and classify it
//! 2. Load or create the checkpoint, dropping entities already completed
//! 3. Check that both destination buckets exist
//! 4. Export `statistics_short_term` into the recent bucket, then
//!    `statistics` into the historical bucket, page by page
//! 5. Finalize the checkpoint and build the [`ExportSummary`]
//!
//! Pages are read with a `(metadata_id, start_ts, id)` cursor, validated, turned
//! into points and written strictly in order. The checkpoint is saved after
//! every written batch, so an interrupted run loses at most one batch.

use crate::adapters::factory::{create_influx_client, create_source};
use crate::adapters::influx::{Point, PointReader, PointWriter};
use crate::adapters::source::RecordSource;
use crate::config::HastatsConfig;
use crate::core::classify::{EntityClassifier, FilterSummary, FilteredEntity};
use crate::core::export::batch::{BatchProcessor, EntityLookup, TimeWindow};
use crate::core::export::retry::{with_retry, RetryPolicy};
use crate::core::export::summary::{ExportError, ExportSummary, TableSummary};
use crate::core::quality::QualityValidator;
use crate::core::state::{CheckpointManager, ConfigSnapshot, ExportCheckpoint};
use crate::domain::{
    HastatsError, InfluxError, RecordCursor, Result, StatTable, StatisticRecord,
};
use chrono::Utc;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Per-invocation switches, usually taken from the command line
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Continue from the checkpoint file if one exists
    pub resume: bool,

    /// Resume even when the checkpoint was written with different settings
    pub force_resume: bool,

    /// Validate only: no writes, no checkpoint persistence
    pub dry_run: bool,

    /// Only export entities whose statistic id contains this substring
    pub entity_pattern: Option<String>,
}

/// Outcome of paging through one table
enum TableOutcome {
    Finished,
    Interrupted,
}

/// Export coordinator
pub struct ExportCoordinator {
    config: HastatsConfig,
    options: ExportOptions,
    source: Arc<dyn RecordSource>,
    writer: Arc<dyn PointWriter>,
    reader: Arc<dyn PointReader>,
    checkpoints: CheckpointManager,
    classifier: EntityClassifier,
    retry: RetryPolicy,
    shutdown: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Assemble a coordinator from already-built collaborators.
    pub fn new(
        config: HastatsConfig,
        options: ExportOptions,
        source: Arc<dyn RecordSource>,
        writer: Arc<dyn PointWriter>,
        reader: Arc<dyn PointReader>,
        checkpoints: CheckpointManager,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let classifier = EntityClassifier::new(&config.filter);
        let retry = RetryPolicy::from_config(&config.retry);
        Self {
            config,
            options,
            source,
            writer,
            reader,
            checkpoints,
            classifier,
            retry,
            shutdown,
        }
    }

    /// Build every collaborator from configuration.
    ///
    /// Opens the source database and creates the InfluxDB client; no request
    /// is sent to InfluxDB yet.
    pub async fn from_config(
        config: HastatsConfig,
        options: ExportOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let source = create_source(&config).await?;
        let influx = create_influx_client(&config)?;
        let checkpoints = CheckpointManager::from_path(&config.export.checkpoint_file);

        Ok(Self::new(
            config,
            options,
            source,
            influx.clone(),
            influx,
            checkpoints,
            shutdown,
        ))
    }

    /// Execute the export
    ///
    /// # Errors
    ///
    /// - Configuration: the checkpoint was written with different settings
    ///   and `force_resume` is off
    /// - InfluxDB: a destination bucket is missing, or a write failed after
    ///   retries (the checkpoint is left `Failed` and resumable)
    /// - Source: reading a page failed after retries
    ///
    /// A shutdown signal is not an error: the summary comes back with
    /// `interrupted` set and the checkpoint saved `InProgress`.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let run_id = ExportCheckpoint::export_id_for(Utc::now());
        let mut summary = ExportSummary::new(run_id.clone());
        summary.dry_run = self.options.dry_run;

        tracing::info!(
            run_id = %run_id,
            source = %self.source.describe(),
            dry_run = self.options.dry_run,
            resume = self.options.resume,
            "Starting export process"
        );

        let (entities, filter_summary) = self.load_entities().await?;
        summary.entities_total = filter_summary.total;
        summary.entities_included = entities.len();

        let mut checkpoint = self.prepare_checkpoint(run_id, entities.len()).await?;
        summary.run_id = checkpoint.export_id.clone();

        let lookup: EntityLookup = entities
            .into_iter()
            .filter(|e| !checkpoint.is_entity_done(e.metadata.id))
            .map(|e| (e.metadata.id, e))
            .collect();
        summary.entities_resumed_skipped = summary.entities_included - lookup.len();
        if summary.entities_resumed_skipped > 0 {
            tracing::info!(
                skipped = summary.entities_resumed_skipped,
                remaining = lookup.len(),
                "Skipping entities completed by a previous run"
            );
        }

        if !self.options.dry_run {
            self.check_buckets().await?;
        }

        checkpoint.mark_started();
        self.persist(&checkpoint).await?;

        let window = TimeWindow::from_years(self.config.export.min_year, self.config.export.max_year)?;
        let mut processor = BatchProcessor::new(QualityValidator::new(&self.config.quality), window);

        for table in StatTable::ALL {
            let bucket = self.bucket_for(table).to_string();
            let mut table_summary = TableSummary::new(table, bucket.clone());

            if checkpoint.is_table_done(table) {
                tracing::info!(table = %table, "Table already exported, skipping");
                table_summary.skipped = true;
                summary.tables.push(table_summary);
                continue;
            }

            let outcome = self
                .export_table(
                    table,
                    &bucket,
                    &lookup,
                    &mut processor,
                    &mut checkpoint,
                    &mut table_summary,
                    &mut summary,
                )
                .await;
            summary.tables.push(table_summary);

            match outcome {
                Ok(TableOutcome::Finished) => {}
                Ok(TableOutcome::Interrupted) => {
                    self.persist(&checkpoint).await?;
                    summary.mark_interrupted("Shutdown signal received");
                    tracing::warn!(
                        table = %table,
                        checkpoint = %self.checkpoints.location(),
                        "Export interrupted; resume with --resume"
                    );
                    return Ok(self.finish(summary, &processor, start_time));
                }
                Err(e) => {
                    checkpoint.mark_failed();
                    summary.entities_failed = checkpoint.failed_metadata_ids.len();
                    if let Err(save_err) = self.persist(&checkpoint).await {
                        tracing::error!(error = %save_err, "Failed to save checkpoint after error");
                    }
                    summary.add_error(
                        ExportError::from_error(&e).with_context(format!("table={table}")),
                    );
                    let summary = self.finish(summary, &processor, start_time);
                    tracing::error!(
                        table = %table,
                        points_written = summary.points_written(),
                        error = %e,
                        "Export failed"
                    );
                    return Err(e);
                }
            }
        }

        for id in lookup.keys() {
            checkpoint.mark_entity_done(*id);
        }
        checkpoint.mark_completed();
        summary.entities_failed = checkpoint.failed_metadata_ids.len();

        if !self.options.dry_run {
            if self.config.export.resume_enabled {
                self.checkpoints.clear().await?;
            } else {
                self.persist(&checkpoint).await?;
            }
        }

        Ok(self.finish(summary, &processor, start_time))
    }

    /// Loads and classifies entity metadata, then applies the entity filter.
    async fn load_entities(&self) -> Result<(Vec<FilteredEntity>, FilterSummary)> {
        let metadata = with_retry(&self.retry, "list_entity_metadata", || {
            self.source.list_entity_metadata()
        })
        .await?;

        let (mut included, filter_summary) = self.classifier.filter_entities(metadata);

        if let Some(pattern) = self.options.entity_pattern.as_deref() {
            included.retain(|e| e.metadata.statistic_id.contains(pattern));
            tracing::info!(
                pattern,
                matched = included.len(),
                "Applied entity filter"
            );
        }

        Ok((included, filter_summary))
    }

    /// Picks up the existing checkpoint when resuming, otherwise starts a new one.
    async fn prepare_checkpoint(
        &self,
        run_id: String,
        total_entities: usize,
    ) -> Result<ExportCheckpoint> {
        let snapshot =
            ConfigSnapshot::from_config(&self.config, self.options.entity_pattern.as_deref());

        if !self.options.resume {
            return Ok(self.checkpoints.create(run_id, total_entities, snapshot));
        }

        match self.checkpoints.load().await? {
            Some(mut checkpoint) if checkpoint.is_resumable() => {
                let changed = checkpoint.export_config.diff(&snapshot);
                if !changed.is_empty() {
                    if !self.options.force_resume {
                        return Err(HastatsError::Configuration(format!(
                            "Checkpoint {} was written with different settings: {}. \
                             Rerun with --force-resume to continue anyway, or start a fresh export",
                            checkpoint.export_id,
                            changed.join(", ")
                        )));
                    }
                    tracing::warn!(
                        export_id = %checkpoint.export_id,
                        changed = %changed.join(", "),
                        "Resuming despite configuration changes"
                    );
                    checkpoint.export_config = snapshot;
                }
                tracing::info!(
                    export_id = %checkpoint.export_id,
                    completed = checkpoint.completed_metadata_ids.len(),
                    points_written = checkpoint.total_points_written,
                    "Resuming export"
                );
                Ok(checkpoint)
            }
            Some(checkpoint) => {
                tracing::info!(
                    export_id = %checkpoint.export_id,
                    status = ?checkpoint.status,
                    "Previous export already finished, starting fresh"
                );
                Ok(self.checkpoints.create(run_id, total_entities, snapshot))
            }
            None => {
                tracing::info!("No checkpoint found, starting fresh");
                Ok(self.checkpoints.create(run_id, total_entities, snapshot))
            }
        }
    }

    async fn check_buckets(&self) -> Result<()> {
        for bucket in [
            &self.config.influxdb.bucket_recent,
            &self.config.influxdb.bucket_historical,
        ] {
            let exists = with_retry(&self.retry, "bucket_exists", || {
                self.reader.bucket_exists(bucket)
            })
            .await?;
            if !exists {
                return Err(InfluxError::BucketNotFound(format!(
                    "{bucket}; run `hastats setup` first"
                ))
                .into());
            }
        }
        Ok(())
    }

    fn bucket_for(&self, table: StatTable) -> &str {
        match table {
            StatTable::ShortTerm => &self.config.influxdb.bucket_recent,
            StatTable::LongTerm => &self.config.influxdb.bucket_historical,
        }
    }

    /// Pages through one table until it is exhausted or shutdown is requested.
    #[allow(clippy::too_many_arguments)]
    async fn export_table(
        &self,
        table: StatTable,
        bucket: &str,
        lookup: &EntityLookup,
        processor: &mut BatchProcessor,
        checkpoint: &mut ExportCheckpoint,
        table_summary: &mut TableSummary,
        summary: &mut ExportSummary,
    ) -> Result<TableOutcome> {
        processor.reset_table();

        let mut ids: Vec<i64> = lookup.keys().copied().collect();
        ids.sort_unstable();

        if ids.is_empty() {
            tracing::info!(table = %table, "No entities left to export");
            checkpoint.mark_table_done(table);
            self.persist(checkpoint).await?;
            return Ok(TableOutcome::Finished);
        }

        let ids = ids.as_slice();
        // Entities finish in id order during the long-term pass
        let mut pending: VecDeque<i64> = ids.iter().copied().collect();

        let expected = with_retry(&self.retry, "count_records", || {
            self.source.count(table, ids)
        })
        .await?;
        crate::log_table_start!(table, bucket, ids.len());
        tracing::info!(table = %table, records = expected, "Records to export");

        let mut cursor = checkpoint.cursor(table).unwrap_or_else(RecordCursor::start);
        if !cursor.is_start() {
            tracing::info!(
                table = %table,
                metadata_id = cursor.metadata_id,
                start_ts = cursor.start_ts,
                row_id = cursor.id,
                "Continuing table from checkpoint cursor"
            );
        }

        let limit = self.config.export.batch_size;
        let table_started = Instant::now();

        loop {
            if *self.shutdown.borrow() {
                tracing::warn!(table = %table, "Shutdown requested, stopping between batches");
                return Ok(TableOutcome::Interrupted);
            }

            let page = with_retry(&self.retry, "page_records", || {
                self.source.page_records(table, ids, cursor, limit)
            })
            .await?;

            let records_read = page.records.len() as u64;
            let last_seen = page.records.last().map(StatisticRecord::cursor);
            let next = page.next;
            let batch_ids: BTreeSet<i64> = page.records.iter().map(|r| r.metadata_id).collect();

            let (accepted, _) = processor.process(page.records, lookup);
            let points: Vec<Point> = accepted.iter().filter_map(Point::from_accepted).collect();

            let written = if self.options.dry_run {
                points.len() as u64
            } else {
                match self.write_points(bucket, &points, summary).await {
                    Ok(written) => written,
                    Err(e) => {
                        for id in &batch_ids {
                            checkpoint.mark_entity_failed(*id);
                        }
                        return Err(e);
                    }
                }
            };

            cursor = next.or(last_seen).unwrap_or(cursor);
            checkpoint.record_batch(table, cursor, records_read, written);

            if table == StatTable::LongTerm {
                if let Some(boundary) = next {
                    while pending.front().is_some_and(|id| *id < boundary.metadata_id) {
                        if let Some(id) = pending.pop_front() {
                            checkpoint.mark_entity_done(id);
                        }
                    }
                }
            }

            self.persist(checkpoint).await?;

            table_summary.batches += 1;
            table_summary.records_read += records_read;
            table_summary.points_written += written;

            if table_summary.batches % self.config.export.progress_interval as u64 == 0 {
                let elapsed = table_started.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    table_summary.records_read as f64 / elapsed
                } else {
                    0.0
                };
                crate::log_batch_progress!(
                    table,
                    table_summary.batches,
                    processor.totals().total,
                    processor.totals().valid,
                    rate
                );
            }

            if next.is_none() {
                break;
            }
        }

        if table == StatTable::LongTerm {
            for id in pending {
                checkpoint.mark_entity_done(id);
            }
        }
        checkpoint.mark_table_done(table);
        self.persist(checkpoint).await?;

        tracing::info!(
            table = %table,
            batches = table_summary.batches,
            records_read = table_summary.records_read,
            points_written = table_summary.points_written,
            "Table export finished"
        );

        Ok(TableOutcome::Finished)
    }

    async fn write_points(
        &self,
        bucket: &str,
        points: &[Point],
        summary: &mut ExportSummary,
    ) -> Result<u64> {
        if points.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let outcome = with_retry(&self.retry, "write_points", || {
            self.writer.write(bucket, points)
        })
        .await?;
        summary.write_time += started.elapsed();

        if !outcome.is_success() {
            summary.write_errors += outcome.errors.len() as u64;
            for error in &outcome.errors {
                tracing::warn!(bucket, error = %error, "Point left out of write");
            }
        }

        Ok(outcome.written as u64)
    }

    /// Saves the checkpoint with retries. Dry runs never persist.
    async fn persist(&self, checkpoint: &ExportCheckpoint) -> Result<()> {
        if self.options.dry_run {
            return Ok(());
        }
        with_retry(&self.retry, "save_checkpoint", || {
            self.checkpoints.save(checkpoint)
        })
        .await
    }

    fn finish(
        &self,
        mut summary: ExportSummary,
        processor: &BatchProcessor,
        start_time: Instant,
    ) -> ExportSummary {
        summary.metrics = processor.totals().clone();
        summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        summary
    }
}
