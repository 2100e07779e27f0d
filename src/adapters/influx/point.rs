//! InfluxDB points and line-protocol encoding
//!
//! One accepted statistic row becomes one point:
//!
//! ```text
//! <unit|domain_data>,category=..,domain=..,entity_id=..,source=migration[,..] value=<f64> <start_ts>
//! ```
//!
//! The tag set matches what Home Assistant's own InfluxDB integration writes,
//! plus `source=migration` so migrated rows can be told apart from live data.

use crate::core::classify::FilteredEntity;
use crate::core::export::AcceptedRecord;
use crate::domain::StatisticRecord;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Value of the `source` tag on every exported point.
pub const MIGRATION_SOURCE: &str = "migration";

/// A single-field InfluxDB point at second precision
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    /// Sorted, so encoded lines are stable
    pub tags: BTreeMap<String, String>,
    pub value: f64,
    /// Unix seconds
    pub timestamp: i64,
}

impl Point {
    /// Builds the point for an accepted record, `None` when the record has no
    /// finite `value` or `mean`.
    pub fn from_accepted(accepted: &AcceptedRecord<'_>) -> Option<Self> {
        Self::from_record(accepted.entity, &accepted.record)
    }

    pub fn from_record(entity: &FilteredEntity, record: &StatisticRecord) -> Option<Self> {
        let value = record.primary_value()?;
        let metadata = &entity.metadata;
        let domain = metadata.domain()?;
        let object_id = metadata.object_id()?;

        let measurement = match metadata.unit() {
            Some(unit) => unit.to_string(),
            None => format!("{domain}_data"),
        };

        let mut tags = BTreeMap::new();
        tags.insert("entity_id".to_string(), object_id.to_string());
        tags.insert("domain".to_string(), domain.to_string());
        tags.insert("category".to_string(), entity.category.as_str().to_string());
        tags.insert("source".to_string(), MIGRATION_SOURCE.to_string());
        if let Some(unit) = metadata.unit() {
            tags.insert("unit".to_string(), unit.to_string());
        }
        if let Some(name) = metadata.friendly_name.as_deref().filter(|n| !n.is_empty()) {
            tags.insert("friendly_name".to_string(), name.to_string());
        }
        if let Some(class) = metadata.device_class.as_deref().filter(|c| !c.is_empty()) {
            tags.insert("device_class".to_string(), class.to_string());
        }

        Some(Self {
            measurement,
            tags,
            value,
            timestamp: record.start_ts.floor() as i64,
        })
    }

    /// Encodes the point as one line of InfluxDB line protocol.
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape(&self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            let _ = write!(
                line,
                ",{}={}",
                escape(key, &[',', '=', ' ']),
                escape(value, &[',', '=', ' '])
            );
        }
        let _ = write!(line, " value={} {}", self.value, self.timestamp);
        line
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Encodes a batch as a newline-separated request body. Points whose value is
/// not finite are left out and reported back.
pub fn encode_batch(points: &[Point]) -> (String, Vec<String>) {
    let mut body = String::new();
    let mut rejected = Vec::new();
    for point in points {
        if !point.value.is_finite() || point.measurement.is_empty() {
            rejected.push(format!(
                "Unencodable point for {}: value={}",
                point
                    .tags
                    .get("entity_id")
                    .map(String::as_str)
                    .unwrap_or("unknown"),
                point.value
            ));
            continue;
        }
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&point.to_line_protocol());
    }
    (body, rejected)
}
