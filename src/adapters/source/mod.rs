//! Statistics source adapters
//!
//! - [`traits`] - The [`RecordSource`] trait the exporter reads through
//! - [`sqlite`] - Home Assistant recorder database (SQLite)

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteSource;
pub use traits::{RecordSource, MAX_SQL_PARAMS};
