//! Entity metadata domain model
//!
//! An entity is one named source of time-series observations in Home Assistant,
//! identified by a dotted `<domain>.<object_id>` statistic id.

use serde::{Deserialize, Serialize};

/// Descriptive metadata for one statistic-producing entity.
///
/// Immutable for the duration of an export run; Home Assistant may change it
/// between runs.
///
/// # Examples
///
/// ```
/// use hastats::domain::entity::EntityMetadata;
///
/// let entity = EntityMetadata::builder()
///     .id(7)
///     .statistic_id("sensor.kitchen_temperature")
///     .unit("°C")
///     .has_mean(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(entity.domain(), Some("sensor"));
/// assert_eq!(entity.object_id(), Some("kitchen_temperature"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Source-assigned integer key (`statistics_meta.id`)
    pub id: i64,

    /// Dotted identifier, unique per database
    pub statistic_id: String,

    /// Integration that produced the statistic (`recorder`, `tibber`, ...)
    pub source: String,

    pub unit_of_measurement: Option<String>,

    pub name: Option<String>,

    pub friendly_name: Option<String>,

    pub device_class: Option<String>,

    pub state_class: Option<String>,

    pub has_mean: bool,

    pub has_sum: bool,
}

impl EntityMetadata {
    /// Creates a new builder for constructing EntityMetadata
    pub fn builder() -> EntityMetadataBuilder {
        EntityMetadataBuilder::default()
    }

    /// Prefix before the first `.`, or `None` for malformed ids.
    pub fn domain(&self) -> Option<&str> {
        self.statistic_id.split_once('.').map(|(domain, _)| domain)
    }

    /// Everything after the first `.`.
    pub fn object_id(&self) -> Option<&str> {
        self.statistic_id.split_once('.').map(|(_, rest)| rest)
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit_of_measurement.as_deref().filter(|u| !u.is_empty())
    }
}

/// Builder for constructing EntityMetadata instances
#[derive(Debug, Default)]
pub struct EntityMetadataBuilder {
    id: Option<i64>,
    statistic_id: Option<String>,
    source: Option<String>,
    unit_of_measurement: Option<String>,
    name: Option<String>,
    friendly_name: Option<String>,
    device_class: Option<String>,
    state_class: Option<String>,
    has_mean: bool,
    has_sum: bool,
}

impl EntityMetadataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn statistic_id(mut self, statistic_id: impl Into<String>) -> Self {
        self.statistic_id = Some(statistic_id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_of_measurement = Some(unit.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn friendly_name(mut self, friendly_name: impl Into<String>) -> Self {
        self.friendly_name = Some(friendly_name.into());
        self
    }

    pub fn device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn state_class(mut self, state_class: impl Into<String>) -> Self {
        self.state_class = Some(state_class.into());
        self
    }

    pub fn has_mean(mut self, has_mean: bool) -> Self {
        self.has_mean = has_mean;
        self
    }

    pub fn has_sum(mut self, has_sum: bool) -> Self {
        self.has_sum = has_sum;
        self
    }

    /// Builds the EntityMetadata
    ///
    /// # Errors
    ///
    /// Returns an error if `id` or `statistic_id` is missing. The source
    /// defaults to `recorder`.
    pub fn build(self) -> Result<EntityMetadata, String> {
        Ok(EntityMetadata {
            id: self.id.ok_or("id is required")?,
            statistic_id: self.statistic_id.ok_or("statistic_id is required")?,
            source: self.source.unwrap_or_else(|| "recorder".to_string()),
            unit_of_measurement: self.unit_of_measurement,
            name: self.name,
            friendly_name: self.friendly_name,
            device_class: self.device_class,
            state_class: self.state_class,
            has_mean: self.has_mean,
            has_sum: self.has_sum,
        })
    }
}

/// Counts of entities grouped by unit and by source, as reported by
/// `analyze-entities`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySummary {
    pub total_entities: u64,
    pub by_unit: Vec<(String, u64)>,
    pub by_source: Vec<(String, u64)>,
    pub short_term_records: u64,
    pub long_term_records: u64,
}
