//! Statistic record domain model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two Home Assistant statistics tables, exported in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTable {
    /// `statistics_short_term`: 5-minute rows, exported to the recent bucket
    ShortTerm,
    /// `statistics`: hourly rows, exported to the historical bucket
    LongTerm,
}

impl StatTable {
    /// Export order. Short-term must finish before long-term starts.
    pub const ALL: [StatTable; 2] = [StatTable::ShortTerm, StatTable::LongTerm];

    pub fn table_name(&self) -> &'static str {
        match self {
            StatTable::ShortTerm => "statistics_short_term",
            StatTable::LongTerm => "statistics",
        }
    }
}

impl fmt::Display for StatTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for StatTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "statistics_short_term" | "short_term" => Ok(StatTable::ShortTerm),
            "statistics" | "long_term" => Ok(StatTable::LongTerm),
            other => Err(format!("Unknown statistics table: {other}")),
        }
    }
}

/// One row from a statistics table.
///
/// Timestamps are Unix seconds as stored by the recorder. Dedup identity is
/// `(metadata_id, start_ts)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub id: i64,
    pub metadata_id: i64,
    pub created_ts: f64,
    pub start_ts: f64,
    pub value: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
    pub last_reset_ts: Option<f64>,
}

/// Numeric fields subject to validation, in check order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Value,
    Mean,
    Min,
    Max,
    Sum,
}

impl RecordField {
    pub const ALL: [RecordField; 5] = [
        RecordField::Value,
        RecordField::Mean,
        RecordField::Min,
        RecordField::Max,
        RecordField::Sum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RecordField::Value => "value",
            RecordField::Mean => "mean",
            RecordField::Min => "min",
            RecordField::Max => "max",
            RecordField::Sum => "sum",
        }
    }
}

impl StatisticRecord {
    pub fn field(&self, field: RecordField) -> Option<f64> {
        match field {
            RecordField::Value => self.value,
            RecordField::Mean => self.mean,
            RecordField::Min => self.min,
            RecordField::Max => self.max,
            RecordField::Sum => self.sum,
        }
    }

    /// Returns a copy with one field replaced.
    pub fn with_field(&self, field: RecordField, new_value: Option<f64>) -> Self {
        let mut next = self.clone();
        match field {
            RecordField::Value => next.value = new_value,
            RecordField::Mean => next.mean = new_value,
            RecordField::Min => next.min = new_value,
            RecordField::Max => next.max = new_value,
            RecordField::Sum => next.sum = new_value,
        }
        next
    }

    pub fn has_any_field(&self) -> bool {
        RecordField::ALL.iter().any(|f| self.field(*f).is_some())
    }

    /// Value exported as the point's `value` field: `value` if finite, else
    /// `mean` if finite.
    pub fn primary_value(&self) -> Option<f64> {
        self.value
            .filter(|v| v.is_finite())
            .or_else(|| self.mean.filter(|v| v.is_finite()))
    }

    pub fn cursor(&self) -> RecordCursor {
        RecordCursor {
            metadata_id: self.metadata_id,
            start_ts: self.start_ts,
            id: self.id,
        }
    }
}

/// Monotonic pagination key: the last `(metadata_id, start_ts, id)` returned.
///
/// The row id only breaks ties between rows sharing entity and start time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordCursor {
    pub metadata_id: i64,
    pub start_ts: f64,
    /// Checkpoints saved without a row id resume after every row with the
    /// same `(metadata_id, start_ts)`.
    #[serde(default = "last_row_id")]
    pub id: i64,
}

fn last_row_id() -> i64 {
    i64::MAX
}

impl RecordCursor {
    /// Position before every row.
    pub fn start() -> Self {
        Self {
            metadata_id: i64::MIN,
            start_ts: f64::NEG_INFINITY,
            id: i64::MIN,
        }
    }

    pub fn is_start(&self) -> bool {
        self.metadata_id == i64::MIN
    }

    /// True when `record` sorts strictly after this position.
    pub fn precedes(&self, record: &StatisticRecord) -> bool {
        (record.metadata_id, record.start_ts, record.id) > (self.metadata_id, self.start_ts, self.id)
    }
}

/// One page of records plus the cursor to continue from, `None` when done.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<StatisticRecord>,
    pub next: Option<RecordCursor>,
}
