//! Export summary and reporting
//!
//! This module defines structures for tracking and reporting export results.

use crate::core::export::batch::ProcessingMetrics;
use crate::domain::{HastatsError, InfluxError, StatTable};
use std::time::Duration;

/// Per-table counters for one run
#[derive(Debug, Clone)]
pub struct TableSummary {
    pub table: StatTable,

    /// Destination bucket
    pub bucket: String,

    /// Rows read from the source in this run
    pub records_read: u64,

    /// Points accepted by the destination (or that would have been, in dry-run)
    pub points_written: u64,

    /// Batches processed
    pub batches: u64,

    /// Skipped because a resumed checkpoint already finished it
    pub skipped: bool,
}

impl TableSummary {
    pub fn new(table: StatTable, bucket: impl Into<String>) -> Self {
        Self {
            table,
            bucket: bucket.into(),
            records_read: 0,
            points_written: 0,
            batches: 0,
            skipped: false,
        }
    }
}

/// Summary of an export operation
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// `%Y%m%d_%H%M%S` run identifier (the checkpoint's export id)
    pub run_id: String,

    /// No points were written and no checkpoint was persisted
    pub dry_run: bool,

    /// Entities listed by the source
    pub entities_total: usize,

    /// Entities admitted by the classifier (after the optional id filter)
    pub entities_included: usize,

    /// Admitted entities skipped because a checkpoint marked them complete
    pub entities_resumed_skipped: usize,

    /// Entities whose points could not be written
    pub entities_failed: usize,

    /// Per-table counters in export order
    pub tables: Vec<TableSummary>,

    /// Points the destination rejected inside otherwise successful writes
    pub write_errors: u64,

    /// Time spent inside destination writes
    pub write_time: Duration,

    /// Validation counters for the whole run
    pub metrics: ProcessingMetrics,

    /// Duration of the export
    pub duration: Duration,

    /// Errors encountered during export
    pub errors: Vec<ExportError>,

    /// Whether the run stopped on a shutdown signal
    pub interrupted: bool,

    /// Reason given when interrupted
    pub shutdown_reason: Option<String>,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            dry_run: false,
            entities_total: 0,
            entities_included: 0,
            entities_resumed_skipped: 0,
            entities_failed: 0,
            tables: Vec::new(),
            write_errors: 0,
            write_time: Duration::ZERO,
            metrics: ProcessingMetrics::new(),
            duration: Duration::ZERO,
            errors: Vec::new(),
            interrupted: false,
            shutdown_reason: None,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Add an error
    pub fn add_error(&mut self, error: ExportError) {
        self.errors.push(error);
    }

    /// Mark the run as stopped by a shutdown signal
    pub fn mark_interrupted(&mut self, reason: impl Into<String>) {
        self.interrupted = true;
        self.shutdown_reason = Some(reason.into());
    }

    pub fn table(&self, table: StatTable) -> Option<&TableSummary> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn records_read(&self) -> u64 {
        self.tables.iter().map(|t| t.records_read).sum()
    }

    pub fn points_written(&self) -> u64 {
        self.tables.iter().map(|t| t.points_written).sum()
    }

    pub fn records_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.records_read() as f64 / secs
    }

    /// Share of processed records that passed validation
    pub fn success_rate(&self) -> f64 {
        self.metrics.success_rate()
    }

    /// Check if the export was successful (no errors, not interrupted)
    pub fn is_successful(&self) -> bool {
        self.errors.is_empty() && !self.interrupted && self.entities_failed == 0
    }

    /// Human-readable data-quality lines, grouped by issue category
    pub fn issue_report(&self) -> Vec<String> {
        self.metrics.issues.report_lines()
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            dry_run = self.dry_run,
            entities_total = self.entities_total,
            entities_included = self.entities_included,
            entities_resumed_skipped = self.entities_resumed_skipped,
            records_read = self.records_read(),
            points_written = self.points_written(),
            write_errors = self.write_errors,
            duration_secs = self.duration.as_secs(),
            records_per_second = %format!("{:.1}", self.records_per_second()),
            success_rate = %format!("{:.2}%", self.success_rate()),
            interrupted = self.interrupted,
            "Export completed"
        );

        for table in &self.tables {
            tracing::info!(
                table = %table.table,
                bucket = %table.bucket,
                records_read = table.records_read,
                points_written = table.points_written,
                batches = table.batches,
                skipped = table.skipped,
                "Table summary"
            );
        }

        self.metrics.log_summary();

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Export completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.error_type,
                    message = %error.message,
                    context = ?error.context,
                    "Export error"
                );
            }
        }
    }
}

/// Type of export error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportErrorType {
    /// Could not reach InfluxDB or open the source
    Connection,
    /// InfluxDB rejected the token
    Authentication,
    /// Reading the Home Assistant database failed
    Source,
    /// Writing points failed
    Write,
    /// Checkpoint persistence failed
    Checkpoint,
    /// Configuration error
    Configuration,
    /// Unknown error
    Unknown,
}

impl ExportErrorType {
    /// Classifies a domain error for reporting.
    pub fn from_error(error: &HastatsError) -> Self {
        match error {
            HastatsError::Configuration(_) | HastatsError::Validation(_) => {
                ExportErrorType::Configuration
            }
            HastatsError::Source(_) => ExportErrorType::Source,
            HastatsError::Influx(InfluxError::AuthenticationFailed(_)) => {
                ExportErrorType::Authentication
            }
            HastatsError::Influx(InfluxError::ConnectionFailed(_))
            | HastatsError::Influx(InfluxError::Timeout(_))
            | HastatsError::Connection(_) => ExportErrorType::Connection,
            HastatsError::Influx(_) => ExportErrorType::Write,
            HastatsError::Checkpoint(_) => ExportErrorType::Checkpoint,
            _ => ExportErrorType::Unknown,
        }
    }
}

/// Export error with context
#[derive(Debug, Clone)]
pub struct ExportError {
    /// Type of error
    pub error_type: ExportErrorType,

    /// Error message
    pub message: String,

    /// Optional context (e.g., table, entity ids)
    pub context: Option<String>,
}

impl ExportError {
    /// Create a new export error
    pub fn new(error_type: ExportErrorType, message: String) -> Self {
        Self {
            error_type,
            message,
            context: None,
        }
    }

    /// Build from a domain error, classifying it
    pub fn from_error(error: &HastatsError) -> Self {
        Self::new(ExportErrorType::from_error(error), error.to_string())
    }

    /// Add context to the error
    pub fn with_context(mut self, context: String) -> Self {
        self.context = Some(context);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_summary_creation() {
        let summary = ExportSummary::new("20240101_120000");

        assert_eq!(summary.run_id, "20240101_120000");
        assert_eq!(summary.entities_total, 0);
        assert_eq!(summary.records_read(), 0);
        assert_eq!(summary.points_written(), 0);
        assert_eq!(summary.duration, Duration::ZERO);
        assert!(summary.errors.is_empty());
        assert!(summary.is_successful());
    }

    #[test]
    fn test_export_summary_with_duration() {
        let summary = ExportSummary::new("run").with_duration(Duration::from_secs(120));

        assert_eq!(summary.duration, Duration::from_secs(120));
    }

    #[test]
    fn test_table_totals_and_rate() {
        let mut summary = ExportSummary::new("run").with_duration(Duration::from_secs(10));
        let mut short = TableSummary::new(StatTable::ShortTerm, "recent");
        short.records_read = 300;
        short.points_written = 280;
        let mut long = TableSummary::new(StatTable::LongTerm, "historical");
        long.records_read = 200;
        long.points_written = 200;
        summary.tables = vec![short, long];

        assert_eq!(summary.records_read(), 500);
        assert_eq!(summary.points_written(), 480);
        assert_eq!(summary.records_per_second(), 50.0);
        assert_eq!(
            summary.table(StatTable::LongTerm).map(|t| t.bucket.as_str()),
            Some("historical")
        );
    }

    #[test]
    fn test_interrupted_is_not_successful() {
        let mut summary = ExportSummary::new("run");
        summary.mark_interrupted("Shutdown signal received");

        assert!(!summary.is_successful());
        assert_eq!(
            summary.shutdown_reason.as_deref(),
            Some("Shutdown signal received")
        );
    }

    #[test]
    fn test_failed_entities_are_not_successful() {
        let mut summary = ExportSummary::new("run");
        summary.entities_failed = 2;
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_export_error_with_context() {
        let error = ExportError::new(ExportErrorType::Write, "Write failed".to_string())
            .with_context("table=statistics".to_string());

        assert_eq!(error.error_type, ExportErrorType::Write);
        assert_eq!(error.context, Some("table=statistics".to_string()));
    }

    #[test]
    fn test_error_type_classification() {
        let auth = HastatsError::Influx(InfluxError::AuthenticationFailed("bad token".into()));
        assert_eq!(
            ExportErrorType::from_error(&auth),
            ExportErrorType::Authentication
        );

        let server = HastatsError::Influx(InfluxError::ServerError {
            status: 503,
            message: "unavailable".into(),
        });
        assert_eq!(ExportErrorType::from_error(&server), ExportErrorType::Write);

        let config = HastatsError::Configuration("missing token".into());
        let error = ExportError::from_error(&config);
        assert_eq!(error.error_type, ExportErrorType::Configuration);
        assert!(error.message.contains("missing token"));
    }

    #[test]
    fn test_export_summary_add_error() {
        let mut summary = ExportSummary::new("run");
        summary.add_error(ExportError::new(
            ExportErrorType::Checkpoint,
            "Failed to save".to_string(),
        ));

        assert_eq!(summary.errors.len(), 1);
        assert!(!summary.is_successful());
    }
}
