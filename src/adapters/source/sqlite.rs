//! Home Assistant recorder database reader
//!
//! Reads `statistics_meta`, `statistics` and `statistics_short_term` through a
//! single read-only rusqlite connection. Every query runs on the blocking pool
//! so the async exporter never stalls on disk I/O.
//!
//! Pagination is keyed on `(metadata_id, start_ts, id)`: each page continues
//! strictly after the last row of the previous one. The row id keeps rows
//! sharing entity and start time apart, so duplicates reach the batch
//! processor no matter where a page ends.

use super::traits::{RecordSource, MAX_SQL_PARAMS};
use crate::domain::{
    EntityMetadata, EntitySummary, HastatsError, RecordCursor, RecordPage, Result, SourceError,
    StatTable, StatisticRecord,
};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags, Row};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::spawn_blocking;

const REQUIRED_TABLES: [&str; 3] = ["statistics_meta", "statistics", "statistics_short_term"];

/// Tables needed to look up the latest state attributes of an entity.
const ATTRIBUTE_TABLES: [&str; 3] = ["states_meta", "states", "state_attributes"];

const RECORD_COLUMNS: &str =
    "id, created_ts, metadata_id, start_ts, mean, min, max, last_reset_ts, state, sum";

const METADATA_WITH_ATTRIBUTES: &str = "
    SELECT sm.id, sm.statistic_id, sm.source, sm.unit_of_measurement,
           sm.has_mean, sm.has_sum, sm.name,
           (SELECT sa.shared_attrs
              FROM states_meta stm
              JOIN states s ON s.metadata_id = stm.metadata_id
              JOIN state_attributes sa ON sa.attributes_id = s.attributes_id
             WHERE stm.entity_id = sm.statistic_id
             ORDER BY s.state_id DESC
             LIMIT 1) AS shared_attrs
      FROM statistics_meta sm
     ORDER BY sm.statistic_id";

const METADATA_PLAIN: &str = "
    SELECT id, statistic_id, source, unit_of_measurement, has_mean, has_sum, name,
           NULL AS shared_attrs
      FROM statistics_meta
     ORDER BY statistic_id";

/// The subset of `state_attributes.shared_attrs` the exporter tags points with.
#[derive(Debug, Default, Deserialize)]
struct SharedAttributes {
    friendly_name: Option<String>,
    device_class: Option<String>,
    state_class: Option<String>,
}

/// Read-only SQLite record source
#[derive(Clone)]
pub struct SqliteSource {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    has_attributes: bool,
}

impl SqliteSource {
    /// Open the database and verify it looks like a Home Assistant recorder.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::OpenFailed`] when the file is missing or cannot be
    /// opened and [`SourceError::MissingTable`] when a statistics table is absent.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SourceError::OpenFailed(format!(
                "Database file not found: {}",
                path.display()
            ))
            .into());
        }

        let open_path = path.clone();
        let conn = spawn_blocking(move || {
            let conn = Connection::open_with_flags(
                &open_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.busy_timeout(Duration::from_secs(5))?;
            Ok::<_, rusqlite::Error>(conn)
        })
        .await
        .map_err(|e| SourceError::WorkerFailed(e.to_string()))?
        .map_err(|e| SourceError::OpenFailed(format!("{}: {e}", path.display())))?;

        let mut source = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            has_attributes: false,
        };

        let tables = source.table_names().await?;
        if let Some(missing) = REQUIRED_TABLES.iter().find(|t| !tables.contains(**t)) {
            return Err(SourceError::MissingTable(missing.to_string()).into());
        }

        source.has_attributes = ATTRIBUTE_TABLES.iter().all(|t| tables.contains(*t));
        if !source.has_attributes {
            tracing::warn!("states_meta not found, entity attributes unavailable");
        }

        tracing::info!(
            path = %source.path.display(),
            attributes = source.has_attributes,
            "Opened Home Assistant database"
        );
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn table_names(&self) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
            let names = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(names)
        })
        .await
    }

    async fn with_conn<F, T>(&self, func: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| rusqlite::Error::InvalidQuery)?;
            func(&guard)
        })
        .await
        .map_err(|e| SourceError::WorkerFailed(e.to_string()))?;
        result.map_err(HastatsError::from)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn page_query(table: StatTable, id_params: usize, with_cursor: bool) -> String {
    let mut conditions = vec![
        "metadata_id IS NOT NULL".to_string(),
        "start_ts IS NOT NULL".to_string(),
    ];
    if id_params > 0 {
        conditions.push(format!("metadata_id IN ({})", placeholders(id_params)));
    }
    if with_cursor {
        conditions.push("(metadata_id, start_ts, id) > (?, ?, ?)".to_string());
    }
    format!(
        "SELECT {RECORD_COLUMNS} FROM {} WHERE {} ORDER BY metadata_id, start_ts, id LIMIT ?",
        table.table_name(),
        conditions.join(" AND ")
    )
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StatisticRecord> {
    Ok(StatisticRecord {
        id: row.get(0)?,
        created_ts: row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
        metadata_id: row.get(2)?,
        start_ts: row.get(3)?,
        mean: row.get(4)?,
        min: row.get(5)?,
        max: row.get(6)?,
        last_reset_ts: row.get(7)?,
        value: row.get(8)?,
        sum: row.get(9)?,
    })
}

fn metadata_from_row(row: &Row<'_>) -> rusqlite::Result<EntityMetadata> {
    let statistic_id: String = row.get(1)?;
    let attrs = row
        .get::<_, Option<String>>(7)?
        .and_then(|raw| serde_json::from_str::<SharedAttributes>(&raw).ok())
        .unwrap_or_default();

    let friendly_name = attrs.friendly_name.or_else(|| {
        statistic_id
            .split_once('.')
            .map(|(_, object_id)| object_id.replace('_', " "))
    });

    Ok(EntityMetadata {
        id: row.get(0)?,
        source: row
            .get::<_, Option<String>>(2)?
            .unwrap_or_else(|| "recorder".to_string()),
        unit_of_measurement: row.get(3)?,
        has_mean: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
        has_sum: row.get::<_, Option<i64>>(5)?.unwrap_or(0) != 0,
        name: row.get(6)?,
        friendly_name,
        device_class: attrs.device_class,
        state_class: attrs.state_class,
        statistic_id,
    })
}

fn grouped_counts(conn: &Connection, column: &str) -> rusqlite::Result<Vec<(String, u64)>> {
    let sql = format!(
        "SELECT COALESCE(NULLIF({column}, ''), '(none)') AS k, COUNT(*) AS n
           FROM statistics_meta GROUP BY k ORDER BY n DESC, k"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[async_trait]
impl RecordSource for SqliteSource {
    async fn list_entity_metadata(&self) -> Result<Vec<EntityMetadata>> {
        let sql = if self.has_attributes {
            METADATA_WITH_ATTRIBUTES
        } else {
            METADATA_PLAIN
        };

        let all = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(sql)?;
                let rows = stmt
                    .query_map([], metadata_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let total = all.len();
        let entities: Vec<EntityMetadata> = all
            .into_iter()
            .filter(|m| {
                let timestamp_only = m.state_class.as_deref() == Some("timestamp");
                if timestamp_only {
                    tracing::debug!(entity = %m.statistic_id, "Skipping timestamp-only entity");
                }
                !timestamp_only
            })
            .collect();

        tracing::info!(
            total,
            returned = entities.len(),
            "Loaded statistics metadata"
        );
        Ok(entities)
    }

    async fn count(&self, table: StatTable, entity_ids: &[i64]) -> Result<u64> {
        let table_name = table.table_name();
        let ids = entity_ids.to_vec();
        self.with_conn(move |conn| {
            if ids.is_empty() {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |r| {
                        r.get(0)
                    })?;
                return Ok(n as u64);
            }

            let mut total = 0u64;
            for chunk in ids.chunks(MAX_SQL_PARAMS) {
                let sql = format!(
                    "SELECT COUNT(*) FROM {table_name} WHERE metadata_id IN ({})",
                    placeholders(chunk.len())
                );
                let n: i64 = conn.query_row(&sql, params_from_iter(chunk.iter()), |r| r.get(0))?;
                total += n as u64;
            }
            Ok(total)
        })
        .await
    }

    async fn page_records(
        &self,
        table: StatTable,
        entity_ids: &[i64],
        cursor: RecordCursor,
        limit: usize,
    ) -> Result<RecordPage> {
        if limit == 0 {
            return Ok(RecordPage::default());
        }

        let sql_filter = entity_ids.len() <= MAX_SQL_PARAMS;
        let client_filter: Option<HashSet<i64>> =
            (!sql_filter).then(|| entity_ids.iter().copied().collect());

        let mut params: Vec<Value> = Vec::new();
        if sql_filter {
            params.extend(entity_ids.iter().map(|id| Value::Integer(*id)));
        }
        let with_cursor = !cursor.is_start();
        if with_cursor {
            params.push(Value::Integer(cursor.metadata_id));
            params.push(Value::Real(cursor.start_ts));
            params.push(Value::Integer(cursor.id));
        }
        params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let sql = page_query(
            table,
            if sql_filter { entity_ids.len() } else { 0 },
            with_cursor,
        );

        let rows = self
            .with_conn(move |conn| {
                let mut stmt = conn.prepare_cached(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(params), record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let next = if rows.len() == limit {
            rows.last().map(StatisticRecord::cursor)
        } else {
            None
        };

        let fetched = rows.len();
        let records: Vec<StatisticRecord> = match client_filter {
            Some(wanted) => rows
                .into_iter()
                .filter(|r| wanted.contains(&r.metadata_id))
                .collect(),
            None => rows,
        };

        tracing::debug!(
            table = %table,
            fetched,
            kept = records.len(),
            done = next.is_none(),
            "Read page"
        );

        Ok(RecordPage { records, next })
    }

    async fn entity_summary(&self) -> Result<EntitySummary> {
        self.with_conn(|conn| {
            let by_unit = grouped_counts(conn, "unit_of_measurement")?;
            let by_source = grouped_counts(conn, "source")?;
            let count = |table: &str| -> rusqlite::Result<u64> {
                let n: i64 =
                    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
                Ok(n as u64)
            };

            Ok(EntitySummary {
                total_entities: count("statistics_meta")?,
                by_unit,
                by_source,
                short_term_records: count(StatTable::ShortTerm.table_name())?,
                long_term_records: count(StatTable::LongTerm.table_name())?,
            })
        })
        .await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
