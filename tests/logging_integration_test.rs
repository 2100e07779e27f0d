//! Integration tests for logging functionality
//!
//! A process can install only one global subscriber, so everything that
//! needs an initialized logger lives in a single test.

use hastats::config::{FilterConfig, LoggingConfig};
use hastats::core::classify::EntityClassifier;
use hastats::domain::HastatsError;
use hastats::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "./logs");
    assert_eq!(config.local_rotation, "daily");
}

#[test]
fn test_invalid_level_is_rejected_before_install() {
    let result = init_logging("chatty", &LoggingConfig::default());
    assert!(matches!(result, Err(HastatsError::Configuration(_))));
}

#[test]
fn test_file_logging_writes_json_lines() {
    std::env::remove_var("RUST_LOG");
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };

    let guard = init_logging("info", &config).unwrap();
    assert!(guard.has_file_output());
    assert!(log_path.is_dir());

    EntityClassifier::new(&FilterConfig::default()).filter_entities(Vec::new());
    hastats::log_table_start!("statistics", "homeassistant-historical", 3);

    // A second subscriber cannot be installed
    assert!(init_logging("debug", &LoggingConfig::default()).is_err());

    drop(guard);

    let contents = std::fs::read_to_string(log_path.join("hastats.log")).unwrap();
    let line = contents
        .lines()
        .find(|l| l.contains("Entity classification complete"))
        .expect("classification summary logged");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["fields"]["total"], 0);
    assert!(event["target"]
        .as_str()
        .unwrap()
        .starts_with("hastats::core::classify"));

    // Events from outside the crate are filtered out
    assert!(!contents.contains("Exporting table"));
}
