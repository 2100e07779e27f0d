//! Entity classification

pub mod classifier;

pub use classifier::{group_by_category, Admission, EntityClassifier, FilteredEntity, FilterSummary};
