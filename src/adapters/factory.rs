//! Adapter factory
//!
//! Builds the source and destination adapters from configuration.

use crate::adapters::influx::InfluxClient;
use crate::adapters::source::{RecordSource, SqliteSource};
use crate::config::schema::HastatsConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Open the configured statistics database.
///
/// # Errors
///
/// Returns an error if the file is missing or is not a Home Assistant
/// recorder database.
pub async fn create_source(config: &HastatsConfig) -> Result<Arc<dyn RecordSource>> {
    tracing::info!(path = %config.source.database_path, "Creating SQLite source");
    let source = SqliteSource::open(&config.source.database_path).await?;
    Ok(Arc::new(source) as Arc<dyn RecordSource>)
}

/// Create the InfluxDB client.
///
/// The returned client implements every destination trait, so callers can
/// coerce the same `Arc` to a writer, a reader, or a bucket admin.
pub fn create_influx_client(config: &HastatsConfig) -> Result<Arc<InfluxClient>> {
    tracing::info!(
        url = %config.influxdb.url,
        org = %config.influxdb.org,
        "Creating InfluxDB client"
    );
    Ok(Arc::new(InfluxClient::new(&config.influxdb)?))
}
