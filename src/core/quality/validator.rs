//! Per-value data quality validation
//!
//! [`QualityValidator::validate`] checks a single numeric observation in this
//! order, returning early on hard failures:
//!
//! 1. NaN or infinite (hard, never corrected)
//! 2. Error sentinel `-999999` / `999999` (hard, never corrected)
//! 3. Unit range from the rule table (soft)
//! 4. Category plausibility (soft)
//!
//! Soft issues mark the value invalid but may still produce a correction.

use crate::config::{QualityConfig, UnitRange};
use crate::domain::SensorCategory;
use std::collections::HashMap;

const ERROR_SENTINELS: [f64; 2] = [-999_999.0, 999_999.0];

const ENERGY_CEILING: f64 = 1_000_000.0;
const POWER_CEILING: f64 = 50_000.0;
const PERCENTAGE_MARGIN: (f64, f64) = (-5.0, 105.0);
const TEMPERATURE_PHYSICAL: (f64, f64) = (-100.0, 200.0);

/// Outcome of validating one value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<String>,
    /// Present only when it differs from the input
    pub corrected_value: Option<f64>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
            corrected_value: None,
        }
    }

    fn hard_failure(issue: String) -> Self {
        Self {
            is_valid: false,
            issues: vec![issue],
            corrected_value: None,
        }
    }
}

/// Built-in unit ranges. Either bound may be open.
pub fn default_unit_ranges() -> HashMap<String, UnitRange> {
    let table: [(&str, Option<f64>, Option<f64>); 12] = [
        ("°C", Some(-50.0), Some(80.0)),
        ("W", Some(0.0), Some(50_000.0)),
        ("kWh", Some(0.0), None),
        ("%", Some(0.0), Some(100.0)),
        ("V", Some(0.0), Some(500.0)),
        ("A", Some(0.0), Some(1_000.0)),
        ("kB/s", Some(0.0), Some(1_000_000.0)),
        ("MB/s", Some(0.0), Some(1_000.0)),
        ("GB", Some(0.0), Some(10_000.0)),
        ("MB", Some(0.0), Some(10_000_000.0)),
        ("hPa", Some(800.0), Some(1_200.0)),
        ("bar", Some(0.8), Some(1.2)),
    ];
    table
        .into_iter()
        .map(|(unit, min, max)| (unit.to_string(), UnitRange { min, max }))
        .collect()
}

/// Stateless validator over a unit range table.
#[derive(Debug, Clone)]
pub struct QualityValidator {
    unit_ranges: HashMap<String, UnitRange>,
}

impl Default for QualityValidator {
    fn default() -> Self {
        Self {
            unit_ranges: default_unit_ranges(),
        }
    }
}

impl QualityValidator {
    /// Built-in ranges with `[quality.unit_ranges]` entries layered on top.
    pub fn new(config: &QualityConfig) -> Self {
        let mut unit_ranges = default_unit_ranges();
        for (unit, range) in &config.unit_ranges {
            unit_ranges.insert(unit.clone(), *range);
        }
        Self { unit_ranges }
    }

    pub fn unit_range(&self, unit: &str) -> Option<&UnitRange> {
        self.unit_ranges.get(unit)
    }

    pub fn validate(
        &self,
        value: f64,
        unit: Option<&str>,
        category: SensorCategory,
    ) -> ValidationResult {
        if value.is_nan() {
            return ValidationResult::hard_failure("Value is NaN".to_string());
        }
        if value.is_infinite() {
            return ValidationResult::hard_failure("Value is infinite".to_string());
        }
        if ERROR_SENTINELS.contains(&value) {
            return ValidationResult::hard_failure(format!(
                "Value appears to be error sentinel ({value})"
            ));
        }

        let mut result = ValidationResult::valid();

        if let Some(unit) = unit {
            if let Some(range) = self.unit_ranges.get(unit) {
                check_range(value, unit, range, &mut result.issues);
            }
        }

        check_category(value, category, &mut result.issues);

        result.is_valid = result.issues.is_empty();
        result.corrected_value = correct(value, unit, category).filter(|c| *c != value);
        result
    }
}

fn check_range(value: f64, unit: &str, range: &UnitRange, issues: &mut Vec<String>) {
    if let Some(min) = range.min {
        if value < min {
            issues.push(format!(
                "Value {value} below minimum {min} for unit {unit}"
            ));
        }
    }
    if let Some(max) = range.max {
        if value > max {
            issues.push(format!(
                "Value {value} above maximum {max} for unit {unit}"
            ));
        }
    }
}

fn check_category(value: f64, category: SensorCategory, issues: &mut Vec<String>) {
    match category {
        SensorCategory::Energy => {
            if value < 0.0 {
                issues.push("Energy value cannot be negative".to_string());
            } else if value > ENERGY_CEILING {
                issues.push("Energy value seems unrealistically high".to_string());
            }
        }
        SensorCategory::Power => {
            if value.abs() > POWER_CEILING {
                issues.push("Power value seems unrealistically high".to_string());
            }
        }
        SensorCategory::Percentage => {
            let (low, high) = PERCENTAGE_MARGIN;
            if value < low || value > high {
                issues.push("Percentage value outside reasonable range".to_string());
            }
        }
        SensorCategory::Temperature => {
            let (low, high) = TEMPERATURE_PHYSICAL;
            if value < low || value > high {
                issues.push("Temperature value outside physically reasonable range".to_string());
            }
        }
        _ => {}
    }
}

fn correct(value: f64, unit: Option<&str>, category: SensorCategory) -> Option<f64> {
    match category {
        SensorCategory::Percentage if unit == Some("%") => Some(value.clamp(0.0, 100.0)),
        SensorCategory::Energy if value < 0.0 => Some(0.0),
        _ => None,
    }
}
