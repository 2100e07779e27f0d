//! End-to-end export scenarios against in-memory collaborators
//!
//! Each test drives a full export and checks what reaches InfluxDB and what
//! the summary reports.

mod common;

use common::*;
use hastats::core::export::ExportOptions;
use hastats::core::quality::IssueCategory;
use hastats::core::state::{CheckpointManager, ConfigSnapshot};
use hastats::domain::StatTable;
use std::sync::Arc;
use tempfile::TempDir;

const RECENT: &str = "homeassistant-recent";
const HISTORICAL: &str = "homeassistant-historical";

#[tokio::test]
async fn test_implausible_power_reading_is_dropped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let source = Arc::new(
        MemorySource::new(vec![entity(1, "sensor.power_draw", "W")]).with_long_term(vec![
            value_record(1, 1, TS, 75_000.0),
            value_record(2, 1, TS + 3600.0, 420.0),
        ]),
    );
    let influx = Arc::new(MemoryInflux::new());

    let summary = coordinator(&config, ExportOptions::default(), source, influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    let points = influx.points_in(HISTORICAL);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].value, 420.0);
    assert_eq!(points[0].measurement, "W");
    assert_eq!(points[0].tags["category"], "power");

    assert_eq!(summary.metrics.valid, 1);
    assert_eq!(summary.metrics.invalid, 1);
    assert_eq!(summary.metrics.corrected, 0);
    assert!(summary.metrics.issues.count(IssueCategory::OutOfRange) >= 1);
    assert!(summary
        .issue_report()
        .iter()
        .any(|line| line.starts_with("Out of range values") && line.contains("sensor.power_draw")));
}

#[tokio::test]
async fn test_battery_over_100_percent_is_clamped() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let source = Arc::new(
        MemorySource::new(vec![entity(7, "sensor.battery", "%")])
            .with_short_term(vec![value_record(1, 7, TS, 104.0)]),
    );
    let influx = Arc::new(MemoryInflux::new());

    let summary = coordinator(&config, ExportOptions::default(), source, influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    let points = influx.points_in(RECENT);
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].value, 100.0);
    assert_eq!(points[0].tags["entity_id"], "battery");
    assert_eq!(points[0].timestamp, TS as i64);
    assert_eq!(summary.metrics.valid, 1);
    assert_eq!(summary.metrics.corrected, 1);
}

#[tokio::test]
async fn test_duplicate_rows_in_one_page_write_one_point() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.export.batch_size = 10;

    let source = Arc::new(
        MemorySource::new(vec![entity(3, "sensor.outdoor_temperature", "°C")]).with_long_term(
            vec![
                mean_record(1, 3, TS, 12.5),
                mean_record(2, 3, TS, 12.5),
                mean_record(3, 3, TS + 3600.0, 11.9),
            ],
        ),
    );
    let influx = Arc::new(MemoryInflux::new());

    let summary = coordinator(&config, ExportOptions::default(), source, influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    assert_eq!(influx.points_in(HISTORICAL).len(), 2);
    assert_eq!(influx.series_keys(HISTORICAL).len(), 2);
    assert_eq!(summary.metrics.duplicates, 1);
    assert_eq!(summary.metrics.valid, 2);
    assert_eq!(summary.metrics.invalid, 1);
}

#[tokio::test]
async fn test_resume_skips_completed_entities() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let checkpoints = CheckpointManager::from_path(checkpoint_path(&config));
    let mut previous = checkpoints.create(
        "20240101_000000",
        2,
        ConfigSnapshot::from_config(&config, None),
    );
    previous.mark_started();
    previous.mark_entity_done(42);
    checkpoints.save(&previous).await.unwrap();

    let source = Arc::new(
        MemorySource::new(vec![
            entity(42, "sensor.attic_temperature", "°C"),
            entity(43, "sensor.cellar_temperature", "°C"),
        ])
        .with_short_term(vec![
            mean_record(1, 42, TS, 31.0),
            mean_record(2, 43, TS, 14.0),
        ])
        .with_long_term(vec![
            mean_record(1, 42, TS, 30.5),
            mean_record(2, 43, TS, 14.2),
        ]),
    );
    let influx = Arc::new(MemoryInflux::new());
    let options = ExportOptions {
        resume: true,
        ..ExportOptions::default()
    };

    let summary = coordinator(&config, options, source.clone(), influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    assert!(!source.requested_ids().contains(&42));
    assert!(influx
        .points()
        .iter()
        .all(|(_, p)| p.tags["entity_id"] == "cellar_temperature"));
    assert_eq!(influx.points().len(), 2);

    assert_eq!(summary.run_id, "20240101_000000");
    assert_eq!(summary.entities_included, 2);
    assert_eq!(summary.entities_resumed_skipped, 1);
    assert!(summary.is_successful());
    assert!(!checkpoint_path(&config).exists());
}

#[tokio::test]
async fn test_tables_go_to_their_own_buckets() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let source = Arc::new(
        MemorySource::new(vec![
            entity(1, "sensor.grid_power", "W"),
            entity(2, "sensor.house_energy", "kWh"),
        ])
        .with_short_term(vec![
            mean_record(1, 1, TS, 400.0),
            mean_record(2, 1, TS + 300.0, 410.0),
            mean_record(3, 1, TS + 600.0, 405.0),
        ])
        .with_long_term(vec![
            value_record(1, 1, TS, 402.0),
            value_record(2, 2, TS, 1200.0),
            value_record(3, 2, TS + 3600.0, 1201.5),
        ]),
    );
    let influx = Arc::new(MemoryInflux::new());

    let summary = coordinator(&config, ExportOptions::default(), source, influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    assert_eq!(influx.points_in(RECENT).len(), 3);
    assert_eq!(influx.points_in(HISTORICAL).len(), 3);

    let short = summary.table(StatTable::ShortTerm).unwrap();
    assert_eq!(short.records_read, 3);
    assert_eq!(short.batches, 2);
    let long = summary.table(StatTable::LongTerm).unwrap();
    assert_eq!(long.points_written, 3);
    assert_eq!(summary.points_written(), 6);
}

#[tokio::test]
async fn test_excluded_entities_are_never_read() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let source = Arc::new(
        MemorySource::new(vec![
            entity(1, "sensor.grid_power", "W"),
            entity(2, "sensor.wifi_signal_strength", "dBm"),
            entity(3, "binary_sensor.door", "%"),
        ])
        .with_long_term(vec![
            mean_record(1, 1, TS, 400.0),
            mean_record(2, 2, TS, -61.0),
            mean_record(3, 3, TS, 1.0),
        ]),
    );
    let influx = Arc::new(MemoryInflux::new());

    let summary = coordinator(&config, ExportOptions::default(), source.clone(), influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    assert_eq!(summary.entities_total, 3);
    assert_eq!(summary.entities_included, 1);
    assert_eq!(source.requested_ids().into_iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(influx.points().len(), 1);
}

#[tokio::test]
async fn test_nothing_admitted_finishes_without_reading_tables() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());

    let source = Arc::new(
        MemorySource::new(vec![entity(1, "sensor.uptime", "s")])
            .with_long_term(vec![mean_record(1, 1, TS, 3600.0)]),
    );
    let influx = Arc::new(MemoryInflux::new());

    let summary = coordinator(&config, ExportOptions::default(), source.clone(), influx.clone(), no_shutdown())
        .execute_export()
        .await
        .unwrap();

    assert!(summary.is_successful());
    assert_eq!(summary.entities_included, 0);
    assert_eq!(source.page_requests(), 0);
    assert!(influx.points().is_empty());
}
