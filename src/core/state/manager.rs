//! Checkpoint persistence
//!
//! [`CheckpointManager`] loads, saves and clears the checkpoint through a
//! [`CheckpointStorage`] backend. The default backend is a pretty-printed JSON
//! file written through a temporary sibling and renamed into place, so a crash
//! mid-write never leaves a truncated checkpoint behind.

use crate::core::state::checkpoint::{ConfigSnapshot, ExportCheckpoint};
use crate::domain::{HastatsError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Storage backend for checkpoints
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Returns `Ok(None)` when no checkpoint exists.
    async fn load(&self) -> Result<Option<ExportCheckpoint>>;

    async fn save(&self, checkpoint: &ExportCheckpoint) -> Result<()>;

    /// Removes the checkpoint. Missing checkpoints are not an error.
    async fn delete(&self) -> Result<()>;

    /// Human-readable location for log and CLI output.
    fn location(&self) -> String;
}

/// JSON file checkpoint storage
pub struct FileCheckpointStorage {
    path: PathBuf,
}

impl FileCheckpointStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CheckpointStorage for FileCheckpointStorage {
    async fn load(&self) -> Result<Option<ExportCheckpoint>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HastatsError::Checkpoint(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let checkpoint = serde_json::from_str(&contents).map_err(|e| {
            HastatsError::Checkpoint(format!(
                "Checkpoint {} is corrupt: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(Some(checkpoint))
    }

    async fn save(&self, checkpoint: &ExportCheckpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(checkpoint)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                HastatsError::Checkpoint(format!(
                    "Failed to create checkpoint directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await.map_err(|e| {
            HastatsError::Checkpoint(format!("Failed to write {}: {}", temp.display(), e))
        })?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            HastatsError::Checkpoint(format!(
                "Failed to move checkpoint into {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn delete(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HastatsError::Checkpoint(format!(
                "Failed to delete {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Checkpoint manager
///
/// Only the export coordinator mutates checkpoints; the manager persists them.
/// Configuration drift between a loaded checkpoint and the current run is
/// reported by [`ConfigSnapshot::diff`] and decided by the caller.
#[derive(Clone)]
pub struct CheckpointManager {
    storage: Arc<dyn CheckpointStorage>,
}

impl CheckpointManager {
    pub fn new(storage: Arc<dyn CheckpointStorage>) -> Self {
        Self { storage }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileCheckpointStorage::new(path)))
    }

    pub fn location(&self) -> String {
        self.storage.location()
    }

    /// Builds a fresh checkpoint. Nothing is persisted until [`save`](Self::save).
    pub fn create(
        &self,
        export_id: impl Into<String>,
        total_entities: usize,
        snapshot: ConfigSnapshot,
    ) -> ExportCheckpoint {
        let checkpoint = ExportCheckpoint::new(export_id, total_entities, snapshot);
        tracing::info!(
            export_id = %checkpoint.export_id,
            total_entities,
            location = %self.location(),
            "Created checkpoint"
        );
        checkpoint
    }

    pub async fn load(&self) -> Result<Option<ExportCheckpoint>> {
        let checkpoint = self.storage.load().await?;
        if let Some(cp) = &checkpoint {
            tracing::info!(
                export_id = %cp.export_id,
                status = ?cp.status,
                completed = cp.completed_metadata_ids.len(),
                failed = cp.failed_metadata_ids.len(),
                "Loaded checkpoint"
            );
        }
        Ok(checkpoint)
    }

    pub async fn save(&self, checkpoint: &ExportCheckpoint) -> Result<()> {
        tracing::debug!(
            export_id = %checkpoint.export_id,
            status = ?checkpoint.status,
            table = ?checkpoint.current_table,
            points = checkpoint.total_points_written,
            "Saving checkpoint"
        );
        self.storage.save(checkpoint).await
    }

    pub async fn clear(&self) -> Result<()> {
        tracing::info!(location = %self.location(), "Clearing checkpoint");
        self.storage.delete().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RecordCursor, StatTable};
    use tempfile::TempDir;

    fn snapshot() -> ConfigSnapshot {
        ConfigSnapshot {
            batch_size: 10,
            bucket_recent: "recent".to_string(),
            bucket_historical: "historical".to_string(),
            include_units: vec!["W".to_string()],
            include_domains: vec!["sensor".to_string()],
            include_sources: vec![],
            exclude_patterns: vec![],
            entity_pattern: None,
        }
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::from_path(dir.path().join("cp.json"));
        assert!(manager.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::from_path(dir.path().join("nested/cp.json"));

        let mut cp = manager.create("20240101_000000", 3, snapshot());
        cp.mark_started();
        cp.mark_entity_done(1);
        cp.mark_entity_failed(2);
        cp.record_batch(
            StatTable::LongTerm,
            RecordCursor {
                metadata_id: 2,
                start_ts: 1_700_000_000.0,
                id: 17,
            },
            40,
            38,
        );
        manager.save(&cp).await.unwrap();

        let loaded = manager.load().await.unwrap().unwrap();
        assert_eq!(loaded.export_id, cp.export_id);
        assert_eq!(loaded.status, cp.status);
        assert_eq!(loaded.completed_metadata_ids, cp.completed_metadata_ids);
        assert_eq!(loaded.failed_metadata_ids, cp.failed_metadata_ids);
        assert_eq!(loaded.long_term_records_processed, 40);
        assert_eq!(loaded.total_points_written, 38);
        assert_eq!(loaded.cursor(StatTable::LongTerm), cp.cursor(StatTable::LongTerm));
        assert_eq!(loaded.export_config, cp.export_config);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        let manager = CheckpointManager::from_path(&path);

        let cp = manager.create("run", 0, snapshot());
        manager.save(&cp).await.unwrap();
        assert!(path.exists());

        manager.clear().await.unwrap();
        assert!(!path.exists());
        manager.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cp.json");
        std::fs::write(&path, "{not json").unwrap();

        let manager = CheckpointManager::from_path(&path);
        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, HastatsError::Checkpoint(_)));
    }
}
