//! Export orchestration and batch processing
//!
//! This module provides the core export logic for Hastats, including:
//! - Per-page validation and deduplication ([`BatchProcessor`])
//! - Retry with exponential backoff for every I/O boundary ([`with_retry`])
//! - Export coordination and orchestration ([`ExportCoordinator`])
//! - Summary and reporting ([`ExportSummary`])

pub mod batch;
pub mod coordinator;
pub mod retry;
pub mod summary;

pub use batch::{AcceptedRecord, BatchProcessor, EntityLookup, ProcessingMetrics, TimeWindow};
pub use coordinator::{ExportCoordinator, ExportOptions};
pub use retry::{with_retry, RetryPolicy};
pub use summary::{ExportError, ExportErrorType, ExportSummary, TableSummary};
