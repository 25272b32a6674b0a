//! Adsignal Core - deterministic enrichment of job-advertisement records.
//!
//! Two engines and their glue:
//! - the **Exposure Resolver** maps occupation (ISCO-08) and industry
//!   (NOGA 2-digit) codes to AI-exposure scores through immutable crosswalk
//!   tables, with employment-share-weighted aggregation and section-level
//!   coarsening;
//! - the **Keyword Classification Engine** scans ad text for AI vocabulary,
//!   applies exclusion contexts and emits a ternary label plus audit spans;
//! - the **Enrichment Orchestrator** composes both per record;
//! - the **Validation Harness** replays the keyword engine against a labeled
//!   corpus to catch rule regressions.
//!
//! Everything here is pure and synchronous: the crosswalk store is loaded
//! once, records are independent, and reruns are bit-identical.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod crosswalk;
pub mod enrich;
pub mod harness;
pub mod keyword;
pub mod record;
pub mod resolver;

pub use crosswalk::{CrosswalkSources, CrosswalkStore, Granularity, SectionRow, TargetRow};
pub use enrich::{enrich_records, enrich_records_with_stats, EnrichStats, RecordFilter};
pub use harness::{evaluate, load_corpus, LabeledCase, Mismatch, Report};
pub use keyword::{Classification, KeywordEngine, RuleSet, Strength};
pub use record::{
    AdRecord, EnrichmentRow, ExposureRecord, IndustryLevel, Label, MatchSpan, OccupationLevel,
    Polarity,
};
pub use resolver::resolve;
