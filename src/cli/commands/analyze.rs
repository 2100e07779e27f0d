//! Analyze-entities command implementation
//!
//! Reads `statistics_meta`, runs the classifier and reports what an export
//! would include. Nothing is written anywhere.

use super::load_or_report;
use crate::adapters::factory::create_source;
use crate::core::classify::{group_by_category, EntityClassifier};
use clap::Args;
use std::collections::BTreeMap;

/// Sample entities shown per category
const SAMPLES_PER_CATEGORY: usize = 3;

/// Excluded units listed with `--verbose`
const TOP_EXCLUDED_UNITS: usize = 10;

/// Arguments for the analyze-entities command
///
/// Use the global `--verbose` flag for unit and source breakdowns.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {}

impl AnalyzeArgs {
    /// Execute the analyze-entities command
    pub async fn execute(&self, config_path: &str, verbose: bool) -> anyhow::Result<i32> {
        tracing::info!("Analyzing entities");

        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let source = match create_source(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open source database");
                println!("   Error: {e}");
                return Ok(4);
            }
        };

        let metadata = match source.list_entity_metadata().await {
            Ok(m) => m,
            Err(e) => {
                println!("❌ Failed to read entity metadata");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        println!("🔍 Analyzing {} entities from {}", metadata.len(), source.describe());
        println!();

        let classifier = EntityClassifier::new(&config.filter);
        let (included, summary) = classifier.filter_entities(metadata);

        println!(
            "✓ Filtering completed: {}/{} ({:.1}%)",
            summary.included,
            summary.total,
            summary.inclusion_rate()
        );
        println!();

        println!("📂 Categories:");
        for (category, entities) in group_by_category(&included) {
            let policy = entities[0].policy;
            println!(
                "  {category}: {} entities ({} over {})",
                entities.len(),
                policy.function,
                policy.window
            );
            for entity in entities.iter().take(SAMPLES_PER_CATEGORY) {
                println!(
                    "    - {} [{}]",
                    entity.metadata.statistic_id,
                    entity.metadata.unit().unwrap_or("no unit")
                );
            }
        }
        println!();

        if verbose {
            println!("📏 Included units:");
            for (unit, count) in top_counts(&summary.included_units, usize::MAX) {
                println!("  {unit}: {count}");
            }
            println!();

            println!("🚫 Top excluded units:");
            for (unit, count) in top_counts(&summary.excluded_units, TOP_EXCLUDED_UNITS) {
                println!("  {unit}: {count}");
            }
            println!();

            println!("❔ Rejection reasons:");
            for (reason, count) in top_counts(&summary.rejection_reasons, usize::MAX) {
                println!("  {reason}: {count}");
            }
            println!();

            match source.entity_summary().await {
                Ok(entity_summary) => {
                    println!("🗄️  Source database:");
                    println!("  Entities: {}", entity_summary.total_entities);
                    println!(
                        "  Short-term records: {}",
                        entity_summary.short_term_records
                    );
                    println!("  Long-term records: {}", entity_summary.long_term_records);
                    println!("  By source:");
                    for (source_name, count) in &entity_summary.by_source {
                        println!("    {source_name}: {count}");
                    }
                    println!();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read entity summary");
                    println!("⚠️  Could not read source totals: {e}");
                }
            }
        }

        Ok(0)
    }
}

/// Entries sorted by descending count, then name; at most `limit`.
fn top_counts(counts: &BTreeMap<String, usize>, limit: usize) -> Vec<(&str, usize)> {
    let mut sorted: Vec<(&str, usize)> = counts
        .iter()
        .map(|(name, count)| {
            let name = if name.is_empty() || name == "none" {
                "no unit"
            } else {
                name.as_str()
            };
            (name, *count)
        })
        .collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    sorted.truncate(limit);
    sorted
}
