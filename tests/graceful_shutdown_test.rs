//! Integration tests for graceful shutdown functionality
//!
//! These tests verify that:
//! - Shutdown signals are properly handled
//! - The checkpoint is saved on shutdown
//! - Exports can resume from interrupted state
//! - No batch is lost or written twice across an interruption

mod common;

use common::*;
use hastats::core::export::summary::ExportSummary;
use hastats::core::export::ExportOptions;
use hastats::core::state::{CheckpointManager, CheckpointStatus};
use hastats::domain::{RecordCursor, StatTable};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

fn power_source() -> MemorySource {
    MemorySource::new(vec![entity(5, "sensor.heat_pump_power", "W")])
        .with_short_term(
            (0..6)
                .map(|n| mean_record(n + 1, 5, TS + 300.0 * n as f64, 800.0 + n as f64))
                .collect(),
        )
        .with_long_term(vec![mean_record(1, 5, TS, 805.0)])
}

#[tokio::test]
async fn test_shutdown_signal_propagation() {
    let (shutdown_tx, shutdown_rx1) = watch::channel(false);
    let shutdown_rx2 = shutdown_rx1.clone();

    assert!(!*shutdown_rx1.borrow());
    assert!(!*shutdown_rx2.borrow());

    shutdown_tx.send(true).unwrap();

    assert!(*shutdown_rx1.borrow());
    assert!(*shutdown_rx2.borrow());
}

#[tokio::test]
async fn test_shutdown_before_first_batch() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let source = Arc::new(power_source());
    let influx = Arc::new(MemoryInflux::new());
    let summary = coordinator(&config, ExportOptions::default(), source.clone(), influx.clone(), shutdown_rx)
        .execute_export()
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert!(!summary.is_successful());
    assert_eq!(
        summary.shutdown_reason.as_deref(),
        Some("Shutdown signal received")
    );
    assert_eq!(source.page_requests(), 0);
    assert!(influx.points().is_empty());

    let checkpoint = CheckpointManager::from_path(checkpoint_path(&config))
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(checkpoint.status, CheckpointStatus::InProgress);
    assert_eq!(checkpoint.total_points_written, 0);
}

#[tokio::test]
async fn test_shutdown_between_batches_saves_cursor() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let influx = Arc::new(MemoryInflux::new().shutdown_after(1, shutdown_tx));
    let summary = coordinator(&config, ExportOptions::default(), Arc::new(power_source()), influx.clone(), shutdown_rx)
        .execute_export()
        .await
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.points_written(), 2);
    assert_eq!(influx.points().len(), 2);

    let checkpoint = CheckpointManager::from_path(checkpoint_path(&config))
        .load()
        .await
        .unwrap()
        .unwrap();
    assert!(checkpoint.is_resumable());
    assert_eq!(checkpoint.current_table, Some(StatTable::ShortTerm));
    assert_eq!(
        checkpoint.cursor(StatTable::ShortTerm),
        Some(RecordCursor {
            metadata_id: 5,
            start_ts: TS + 300.0,
            id: 2,
        })
    );
    assert_eq!(checkpoint.total_points_written, 2);
}

#[tokio::test]
async fn test_resume_after_shutdown_writes_every_point_once() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let first = Arc::new(MemoryInflux::new().shutdown_after(2, shutdown_tx));
    let interrupted = coordinator(&config, ExportOptions::default(), Arc::new(power_source()), first.clone(), shutdown_rx)
        .execute_export()
        .await
        .unwrap();
    assert!(interrupted.interrupted);

    let second = Arc::new(MemoryInflux::new());
    let options = ExportOptions {
        resume: true,
        ..ExportOptions::default()
    };
    let resumed = coordinator(&config, options, Arc::new(power_source()), second.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();
    assert!(resumed.is_successful());
    assert_eq!(resumed.run_id, interrupted.run_id);

    let mut all = first.points();
    all.extend(second.points());
    assert_eq!(all.len(), 7);

    let recent = "homeassistant-recent";
    let mut keys = first.series_keys(recent);
    keys.extend(second.series_keys(recent));
    assert_eq!(keys.len(), 6);
    assert!(!checkpoint_path(&config).exists());
}

#[test]
fn test_interrupted_summary() {
    let mut summary = ExportSummary::new("20240101_000000");
    assert!(summary.is_successful());

    summary.mark_interrupted("Shutdown signal received");

    assert!(summary.interrupted);
    assert!(!summary.is_successful());
    assert_eq!(
        summary.shutdown_reason,
        Some("Shutdown signal received".to_string())
    );
}
