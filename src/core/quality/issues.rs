//! Coarse issue buckets for the end-of-run data quality report

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Sample entities shown per bucket in reports.
pub const SAMPLE_ENTITIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum IssueCategory {
    NaN,
    Infinite,
    OutOfRange,
    Negative,
    Sentinel,
    Other,
}

impl IssueCategory {
    /// Buckets an issue string produced by the validator or batch processor.
    pub fn from_issue(issue: &str) -> Self {
        let lower = issue.to_lowercase();
        if issue.contains("NaN") {
            IssueCategory::NaN
        } else if lower.contains("infinite") {
            IssueCategory::Infinite
        } else if lower.contains("below minimum")
            || lower.contains("above maximum")
            || lower.contains("outside")
            || lower.contains("unrealistically high")
        {
            IssueCategory::OutOfRange
        } else if lower.contains("negative") {
            IssueCategory::Negative
        } else if lower.contains("sentinel") {
            IssueCategory::Sentinel
        } else {
            IssueCategory::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::NaN => "NaN values",
            IssueCategory::Infinite => "Infinite values",
            IssueCategory::OutOfRange => "Out of range values",
            IssueCategory::Negative => "Negative values (invalid for type)",
            IssueCategory::Sentinel => "Error sentinel values",
            IssueCategory::Other => "Other validation issues",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueBucket {
    pub count: u64,
    pub entities: BTreeSet<String>,
}

/// Histogram of issues with the entities that produced them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueTracker {
    buckets: BTreeMap<IssueCategory, IssueBucket>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: &str, entity_id: &str) {
        let bucket = self
            .buckets
            .entry(IssueCategory::from_issue(issue))
            .or_default();
        bucket.count += 1;
        bucket.entities.insert(entity_id.to_string());
    }

    pub fn merge(&mut self, other: &IssueTracker) {
        for (category, bucket) in &other.buckets {
            let mine = self.buckets.entry(*category).or_default();
            mine.count += bucket.count;
            mine.entities.extend(bucket.entities.iter().cloned());
        }
    }

    pub fn count(&self, category: IssueCategory) -> u64 {
        self.buckets.get(&category).map_or(0, |b| b.count)
    }

    pub fn total(&self) -> u64 {
        self.buckets.values().map(|b| b.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// One line per bucket, largest first, each naming up to three entities.
    pub fn report_lines(&self) -> Vec<String> {
        let mut buckets: Vec<_> = self.buckets.iter().collect();
        buckets.sort_by(|a, b| b.1.count.cmp(&a.1.count).then(a.0.cmp(b.0)));

        buckets
            .into_iter()
            .map(|(category, bucket)| {
                let samples: Vec<&str> = bucket
                    .entities
                    .iter()
                    .take(SAMPLE_ENTITIES)
                    .map(String::as_str)
                    .collect();
                let more = bucket.entities.len().saturating_sub(SAMPLE_ENTITIES);
                let suffix = if more > 0 {
                    format!(" (+{more} more)")
                } else {
                    String::new()
                };
                format!(
                    "{}: {} occurrences in {} entities, e.g. {}{}",
                    category,
                    bucket.count,
                    bucket.entities.len(),
                    samples.join(", "),
                    suffix
                )
            })
            .collect()
    }
}
