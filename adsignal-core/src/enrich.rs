//! Enrichment orchestrator.
//!
//! Composition only: resolve exposure and classify text, then merge on the
//! ad identifier. No per-record state crosses iterations, so the fan-out is
//! rayon-parallel with an order-stable collect and the output is identical
//! to a sequential run.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::crosswalk::CrosswalkStore;
use crate::keyword::KeywordEngine;
use crate::record::{AdRecord, EnrichmentRow, Label};
use crate::resolver::resolve;

// ============================================================================
// Filters
// ============================================================================

/// Year-range and source-subset filter for a production run. Both year
/// bounds are inclusive; records without a year pass only an unbounded
/// filter.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub source: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, ad: &AdRecord) -> bool {
        if self.start_year.is_some() || self.end_year.is_some() {
            let Some(year) = ad.year else { return false };
            if let Some(start) = self.start_year {
                if year < start {
                    return false;
                }
            }
            if let Some(end) = self.end_year {
                if year > end {
                    return false;
                }
            }
        }
        if let Some(source) = &self.source {
            if ad.source.as_deref() != Some(source.as_str()) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Run statistics
// ============================================================================

/// Attachment counters for one run, logged at completion so missingness is
/// auditable instead of silent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
    pub total: usize,
    pub occupation_attached: usize,
    pub occupation_missing: usize,
    pub industry_attached: usize,
    pub industry_missing: usize,
    pub labeled_true: usize,
    pub labeled_maybe: usize,
    pub labeled_false: usize,
    pub labeled_missing: usize,
    /// Unmapped occupation codes and how often they occurred;
    /// records without a code count under `__missing__`
    pub occupation_gaps: BTreeMap<String, u64>,
    /// Unmapped industry codes and how often they occurred
    pub industry_gaps: BTreeMap<String, u64>,
}

const GAP_KEY_ABSENT: &str = "__missing__";

impl EnrichStats {
    fn record(&mut self, ad: &AdRecord, row: &EnrichmentRow) {
        self.total += 1;

        if row.exposure.occupation_exposure.is_some() {
            self.occupation_attached += 1;
        } else {
            self.occupation_missing += 1;
            let key = ad.occupation_code.clone().unwrap_or_else(|| GAP_KEY_ABSENT.into());
            *self.occupation_gaps.entry(key).or_default() += 1;
        }

        if row.exposure.industry_exposure_weighted.is_some() {
            self.industry_attached += 1;
        } else {
            self.industry_missing += 1;
            let key = ad.industry_code.clone().unwrap_or_else(|| GAP_KEY_ABSENT.into());
            *self.industry_gaps.entry(key).or_default() += 1;
        }

        match row.ai_requirement {
            Label::True => self.labeled_true += 1,
            Label::Maybe => self.labeled_maybe += 1,
            Label::False => self.labeled_false += 1,
            Label::Missing => self.labeled_missing += 1,
        }
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "{} ads: occupation exposure attached {}/{}, industry exposure attached {}/{}, labels true={} maybe={} false={} missing={}",
            self.total,
            self.occupation_attached,
            self.total,
            self.industry_attached,
            self.total,
            self.labeled_true,
            self.labeled_maybe,
            self.labeled_false,
            self.labeled_missing,
        )
    }
}

// ============================================================================
// Orchestration
// ============================================================================

fn enrich_one(store: &CrosswalkStore, engine: &KeywordEngine, ad: &AdRecord) -> EnrichmentRow {
    let exposure = resolve(store, ad);
    let classification = engine.classify_opt(ad.text.as_deref());
    EnrichmentRow {
        ad_id: ad.ad_id.clone(),
        year: ad.year,
        occupation_code: ad.occupation_code.clone(),
        industry_code: ad.industry_code.clone(),
        exposure,
        ai_requirement: classification.label,
        matches: classification.spans,
    }
}

/// Enrich every record. Input order is preserved.
pub fn enrich_records(
    store: &CrosswalkStore,
    engine: &KeywordEngine,
    records: &[AdRecord],
) -> Vec<EnrichmentRow> {
    records
        .par_iter()
        .map(|ad| enrich_one(store, engine, ad))
        .collect()
}

/// Enrich every record and tally run statistics.
pub fn enrich_records_with_stats(
    store: &CrosswalkStore,
    engine: &KeywordEngine,
    records: &[AdRecord],
) -> (Vec<EnrichmentRow>, EnrichStats) {
    let rows = enrich_records(store, engine, records);

    let mut stats = EnrichStats::default();
    for (ad, row) in records.iter().zip(&rows) {
        stats.record(ad, row);
    }
    tracing::info!(
        total = stats.total,
        occupation_attached = stats.occupation_attached,
        industry_attached = stats.industry_attached,
        "Enrichment run complete: {}",
        stats.summary()
    );
    (rows, stats)
}
