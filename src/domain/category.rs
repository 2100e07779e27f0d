//! Sensor categories and their aggregation policies

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic grouping of an entity. Drives validation rules and aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorCategory {
    Energy,
    Power,
    Temperature,
    Percentage,
    Electrical,
    Network,
    Pressure,
    Special,
    /// Terminal: the entity takes no further part in the export
    Excluded,
}

impl SensorCategory {
    pub const ALL: [SensorCategory; 9] = [
        SensorCategory::Energy,
        SensorCategory::Power,
        SensorCategory::Temperature,
        SensorCategory::Percentage,
        SensorCategory::Electrical,
        SensorCategory::Network,
        SensorCategory::Pressure,
        SensorCategory::Special,
        SensorCategory::Excluded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorCategory::Energy => "energy",
            SensorCategory::Power => "power",
            SensorCategory::Temperature => "temperature",
            SensorCategory::Percentage => "percentage",
            SensorCategory::Electrical => "electrical",
            SensorCategory::Network => "network",
            SensorCategory::Pressure => "pressure",
            SensorCategory::Special => "special",
            SensorCategory::Excluded => "excluded",
        }
    }

    /// Aggregation policy, `None` for `Excluded`.
    pub fn policy(&self) -> Option<&'static AggregationPolicy> {
        AGGREGATION_POLICIES
            .iter()
            .find(|(category, _)| category == self)
            .map(|(_, policy)| policy)
    }
}

impl fmt::Display for SensorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationFunction {
    /// Cumulative quantities keep the last reading of the window
    Last,
    /// Instantaneous quantities are averaged
    Mean,
}

impl fmt::Display for AggregationFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationFunction::Last => f.write_str("last"),
            AggregationFunction::Mean => f.write_str("mean"),
        }
    }
}

/// How downstream compaction should roll up a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationPolicy {
    pub function: AggregationFunction,
    pub window: &'static str,
    pub description: &'static str,
}

const fn policy(
    function: AggregationFunction,
    description: &'static str,
) -> AggregationPolicy {
    AggregationPolicy {
        function,
        window: "1h",
        description,
    }
}

static AGGREGATION_POLICIES: [(SensorCategory, AggregationPolicy); 8] = [
    (
        SensorCategory::Energy,
        policy(
            AggregationFunction::Last,
            "Cumulative energy counters keep the last reading per hour",
        ),
    ),
    (
        SensorCategory::Power,
        policy(AggregationFunction::Mean, "Average power draw per hour"),
    ),
    (
        SensorCategory::Temperature,
        policy(AggregationFunction::Mean, "Average temperature per hour"),
    ),
    (
        SensorCategory::Percentage,
        policy(AggregationFunction::Mean, "Average percentage per hour"),
    ),
    (
        SensorCategory::Electrical,
        policy(AggregationFunction::Mean, "Average voltage and current per hour"),
    ),
    (
        SensorCategory::Network,
        policy(AggregationFunction::Mean, "Average throughput and usage per hour"),
    ),
    (
        SensorCategory::Pressure,
        policy(AggregationFunction::Mean, "Average pressure per hour"),
    ),
    (
        SensorCategory::Special,
        policy(
            AggregationFunction::Last,
            "Provider sensors keep the last reading per hour",
        ),
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_admitted_category_has_policy() {
        for category in SensorCategory::ALL {
            let policy = category.policy();
            if category == SensorCategory::Excluded {
                assert!(policy.is_none());
            } else {
                assert_eq!(policy.map(|p| p.window), Some("1h"));
            }
        }
    }

    #[test]
    fn test_cumulative_categories_use_last() {
        assert_eq!(
            SensorCategory::Energy.policy().map(|p| p.function),
            Some(AggregationFunction::Last)
        );
        assert_eq!(
            SensorCategory::Special.policy().map(|p| p.function),
            Some(AggregationFunction::Last)
        );
        assert_eq!(
            SensorCategory::Temperature.policy().map(|p| p.function),
            Some(AggregationFunction::Mean)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SensorCategory::Power.to_string(), "power");
        assert_eq!(AggregationFunction::Last.to_string(), "last");
    }
}
