// Checkpoint state for resumable exports

pub mod checkpoint;
pub mod manager;

pub use checkpoint::{CheckpointStatus, ConfigSnapshot, ExportCheckpoint};
pub use manager::{CheckpointManager, CheckpointStorage, FileCheckpointStorage};
