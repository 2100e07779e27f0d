//! Entity classification and admission
//!
//! Two independent predicates:
//! - [`EntityClassifier::classify`] assigns a [`SensorCategory`] from source, id
//!   patterns and unit.
//! - [`EntityClassifier::admit`] decides whether the entity is exported at all,
//!   which additionally depends on its domain and on status-indicator names.
//!
//! A unit can map to a real category while the entity is still rejected by
//! domain, so callers must not treat `classify(..) != Excluded` as admission.

use crate::config::FilterConfig;
use crate::domain::{AggregationPolicy, EntityMetadata, SensorCategory};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Identifier fragments that mark an entity as a connectivity or health
/// indicator rather than a measurement.
const STATUS_INDICATORS: [&str; 6] = [
    "availability",
    "status",
    "connected",
    "online",
    "signal",
    "rssi",
];

/// Outcome of [`EntityClassifier::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub admitted: bool,
    pub category: SensorCategory,
    pub reason: String,
}

/// An admitted entity with everything the exporter needs to tag its points.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredEntity {
    pub metadata: EntityMetadata,
    pub category: SensorCategory,
    pub policy: &'static AggregationPolicy,
    pub reason: String,
}

/// Counts produced by [`EntityClassifier::filter_entities`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterSummary {
    pub total: usize,
    pub included: usize,
    pub excluded: usize,
    pub category_breakdown: BTreeMap<SensorCategory, usize>,
    pub included_units: BTreeMap<String, usize>,
    pub excluded_units: BTreeMap<String, usize>,
    pub rejection_reasons: BTreeMap<String, usize>,
}

impl FilterSummary {
    /// Percentage of entities admitted, 0 when there were none.
    pub fn inclusion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.included as f64 / self.total as f64 * 100.0
        }
    }
}

/// Pure classifier over a [`FilterConfig`].
#[derive(Debug, Clone)]
pub struct EntityClassifier {
    include_units: HashSet<String>,
    include_sources: HashSet<String>,
    exclude_patterns: Vec<String>,
    include_domains: HashSet<String>,
}

impl EntityClassifier {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            include_units: config.include_units.iter().cloned().collect(),
            include_sources: config.include_sources.iter().cloned().collect(),
            exclude_patterns: config
                .exclude_patterns
                .iter()
                .map(|p| p.replace('%', "").to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            include_domains: config.include_domains.iter().cloned().collect(),
        }
    }

    /// Assigns exactly one category. Total and deterministic.
    pub fn classify(&self, metadata: &EntityMetadata) -> SensorCategory {
        if self.include_sources.contains(&metadata.source) {
            return SensorCategory::Special;
        }

        let id = metadata.statistic_id.to_lowercase();
        if self.exclude_patterns.iter().any(|p| id.contains(p.as_str())) {
            return SensorCategory::Excluded;
        }

        match metadata.unit() {
            Some(unit) => self.category_for_unit(unit),
            None => SensorCategory::Excluded,
        }
    }

    fn category_for_unit(&self, unit: &str) -> SensorCategory {
        match unit {
            "kWh" => SensorCategory::Energy,
            "W" => SensorCategory::Power,
            "°C" | "°F" => SensorCategory::Temperature,
            "%" => SensorCategory::Percentage,
            "A" | "V" => SensorCategory::Electrical,
            "kB/s" | "MB/s" | "GB" | "MB" => SensorCategory::Network,
            "hPa" | "bar" | "mbar" => SensorCategory::Pressure,
            other if self.include_units.contains(other) => SensorCategory::Special,
            _ => SensorCategory::Excluded,
        }
    }

    /// Decides whether an entity is exported, with a human-readable reason.
    pub fn admit(&self, metadata: &EntityMetadata) -> Admission {
        let category = self.classify(metadata);
        let reject = |reason: String| Admission {
            admitted: false,
            category,
            reason,
        };

        let Some(domain) = metadata.domain() else {
            return reject("Invalid entity ID format".to_string());
        };

        if !self.include_domains.contains(domain) {
            return reject(format!("Domain '{domain}' not in include list"));
        }

        if category == SensorCategory::Excluded {
            return reject("Excluded by filter patterns or unsupported unit".to_string());
        }

        let id = metadata.statistic_id.to_lowercase();
        if let Some(indicator) = STATUS_INDICATORS.iter().find(|i| id.contains(*i)) {
            return reject(format!("Status indicator: {indicator}"));
        }

        Admission {
            admitted: true,
            category,
            reason: format!("Included as {category}"),
        }
    }

    /// Splits entities into the admitted set and a summary of the rest.
    pub fn filter_entities(
        &self,
        entities: Vec<EntityMetadata>,
    ) -> (Vec<FilteredEntity>, FilterSummary) {
        let mut summary = FilterSummary {
            total: entities.len(),
            ..FilterSummary::default()
        };
        let mut included = Vec::new();

        for metadata in entities {
            let admission = self.admit(&metadata);
            let unit = metadata.unit().unwrap_or("none").to_string();

            match (admission.admitted, admission.category.policy()) {
                (true, Some(policy)) => {
                    *summary
                        .category_breakdown
                        .entry(admission.category)
                        .or_default() += 1;
                    *summary.included_units.entry(unit).or_default() += 1;
                    included.push(FilteredEntity {
                        metadata,
                        category: admission.category,
                        policy,
                        reason: admission.reason,
                    });
                }
                _ => {
                    *summary.excluded_units.entry(unit).or_default() += 1;
                    *summary
                        .rejection_reasons
                        .entry(admission.reason)
                        .or_default() += 1;
                }
            }
        }

        summary.included = included.len();
        summary.excluded = summary.total - summary.included;

        tracing::info!(
            total = summary.total,
            included = summary.included,
            excluded = summary.excluded,
            inclusion_rate = %format!("{:.1}", summary.inclusion_rate()),
            "Entity classification complete"
        );

        (included, summary)
    }
}

/// Groups admitted entities by category, preserving input order within a group.
pub fn group_by_category(
    entities: &[FilteredEntity],
) -> BTreeMap<SensorCategory, Vec<&FilteredEntity>> {
    let mut groups: BTreeMap<SensorCategory, Vec<&FilteredEntity>> = BTreeMap::new();
    for entity in entities {
        groups.entry(entity.category).or_default().push(entity);
    }
    groups
}
