//! Data quality validation and issue reporting

pub mod issues;
pub mod validator;

pub use issues::{IssueCategory, IssueTracker};
pub use validator::{default_unit_ranges, QualityValidator, ValidationResult};
