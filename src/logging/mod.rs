//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - Human-readable console output
//! - Optional JSON file output with rotation
//! - `RUST_LOG` override
//!
//! # Example
//!
//! ```no_run
//! use hastats::logging::init_logging;
//! use hastats::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "statistics", "Exporting table");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a table export
///
/// ```no_run
/// use hastats::log_table_start;
///
/// log_table_start!("statistics_short_term", "homeassistant-recent", 1200);
/// ```
#[macro_export]
macro_rules! log_table_start {
    ($table:expr, $bucket:expr, $entities:expr) => {
        tracing::info!(
            table = %$table,
            bucket = %$bucket,
            entities = $entities,
            "Exporting table"
        );
    };
}

/// Log periodic batch progress
///
/// ```no_run
/// use hastats::log_batch_progress;
///
/// log_batch_progress!("statistics", 20, 20_000u64, 19_500u64, 850.0);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($table:expr, $batch:expr, $processed:expr, $valid:expr, $rate:expr) => {
        tracing::info!(
            table = %$table,
            batch = $batch,
            processed = $processed,
            valid = $valid,
            valid_pct = if $processed > 0 {
                $valid as f64 / $processed as f64 * 100.0
            } else {
                100.0
            },
            records_per_sec = $rate,
            "Export progress"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use hastats::log_retry_attempt;
///
/// log_retry_attempt!("write_points", 2, 3, 2000u64, "Connection reset");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($operation:expr, $attempt:expr, $max_attempts:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            operation = $operation,
            attempt = $attempt,
            max_attempts = $max_attempts,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
