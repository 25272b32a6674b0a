//! Record types shared across the enrichment pipeline.

use serde::{Deserialize, Serialize};

// ============================================================================
// Classification granularities
// ============================================================================

/// Occupation code granularity, finest first.
///
/// The coarsening chain is data: adding a level means extending
/// [`OccupationLevel::COARSENING`], not touching resolver logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupationLevel {
    /// National stem code (finest)
    Stem,
    /// ISCO-08 4-digit unit group
    Isco4,
    /// ISCO-08 2-digit sub-major group
    Isco2,
    /// ISCO-08 1-digit major group
    Isco1,
}

impl OccupationLevel {
    /// Ordered coarsening chain, finest to coarsest.
    pub const COARSENING: [Self; 4] = [Self::Stem, Self::Isco4, Self::Isco2, Self::Isco1];

    /// Next coarser level, if any.
    pub const fn coarser(self) -> Option<Self> {
        match self {
            Self::Stem => Some(Self::Isco4),
            Self::Isco4 => Some(Self::Isco2),
            Self::Isco2 => Some(Self::Isco1),
            Self::Isco1 => None,
        }
    }
}

/// Industry code granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndustryLevel {
    /// NOGA 2-digit division
    Noga2,
    /// NOGA section (letter code; combined classes such as "AB" are atomic)
    Section,
}

impl IndustryLevel {
    /// Ordered coarsening chain, finest to coarsest.
    pub const COARSENING: [Self; 2] = [Self::Noga2, Self::Section];

    /// Next coarser level, if any.
    pub const fn coarser(self) -> Option<Self> {
        match self {
            Self::Noga2 => Some(Self::Section),
            Self::Section => None,
        }
    }
}

// ============================================================================
// Input record
// ============================================================================

/// One cleaned job-advertisement record. Immutable once ingested.
///
/// Field aliases accept the survey's original column names, and numeric
/// codes are normalized on read (zero-padded, negative special codes
/// dropped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdRecord {
    /// Stable ad identifier
    #[serde(alias = "adve_iden_sjob")]
    pub ad_id: String,

    /// Posting year
    #[serde(default, alias = "adve_time_year")]
    pub year: Option<i32>,

    /// Occupation code at `occupation_level` granularity
    #[serde(
        default,
        alias = "occu_isco_2008",
        deserialize_with = "de_isco_code"
    )]
    pub occupation_code: Option<String>,

    /// Granularity of `occupation_code`
    #[serde(default = "default_occupation_level")]
    pub occupation_level: OccupationLevel,

    /// NOGA 2-digit industry code
    #[serde(
        default,
        alias = "comp_indu_noga",
        deserialize_with = "de_noga_code"
    )]
    pub industry_code: Option<String>,

    /// Full ad text
    #[serde(default, alias = "adve_text_adve")]
    pub text: Option<String>,

    /// Ad source (press, portal, company site); used by the subset filter
    #[serde(default)]
    pub source: Option<String>,
}

fn default_occupation_level() -> OccupationLevel {
    OccupationLevel::Isco4
}

/// Accept string or integer codes; negatives are survey special codes and
/// map to None. `width` is the zero-padded canonical length.
fn normalize_code(raw: Option<CodeValue>, width: usize) -> Option<String> {
    match raw? {
        CodeValue::Int(n) => {
            if n < 0 {
                None
            } else {
                Some(format!("{:0width$}", n, width = width))
            }
        }
        CodeValue::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            if let Ok(n) = trimmed.parse::<i64>() {
                if n < 0 {
                    return None;
                }
                return Some(format!("{:0width$}", n, width = width));
            }
            // non-numeric codes (section letters, stems) pass through
            Some(trimmed.to_uppercase())
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodeValue {
    Int(i64),
    Str(String),
}

fn de_isco_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<CodeValue>::deserialize(deserializer)?;
    Ok(normalize_code(raw, 4))
}

fn de_noga_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<CodeValue>::deserialize(deserializer)?;
    Ok(normalize_code(raw, 2))
}

// ============================================================================
// Exposure output
// ============================================================================

/// Resolved exposure fields for one ad. Every field is independently
/// nullable: absence of a mapping is missing, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureRecord {
    /// Occupation-level exposure (no coarsening fallback)
    pub occupation_exposure: Option<f64>,
    /// Unweighted industry mean; diagnostics only, never a substitute for
    /// the weighted field
    pub industry_exposure: Option<f64>,
    /// Employment-share-weighted industry exposure; canonical for analysis
    pub industry_exposure_weighted: Option<f64>,
    /// NOGA section code ("C", or a combined class such as "AB")
    pub industry_section: Option<String>,
    /// Section label
    pub industry_section_label: Option<String>,
    /// Unweighted section-level mean (diagnostics)
    pub industry_section_exposure: Option<f64>,
    /// Weighted section-level exposure
    pub industry_section_exposure_weighted: Option<f64>,
    /// Target rows contributing to the occupation score (audit)
    pub occupation_source_count: usize,
    /// Target rows contributing to the industry score (audit)
    pub industry_contribution_count: usize,
}

// ============================================================================
// Keyword classification output
// ============================================================================

/// Whether a matched span counts as evidence or was negated by context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Counts toward the label
    Confirmed,
    /// Negated by an exclusion context; contributes no evidence
    Excluded,
}

/// One keyword match. Offsets are byte positions in the dash-normalized
/// text the engine matched against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    /// Rule term that produced the match
    pub term: String,
    pub polarity: Polarity,
    pub strength: crate::keyword::Strength,
}

/// Aggregate AI-requirement judgment for an ad.
///
/// Closed enum so aggregation handling is exhaustive at compile time; the
/// string forms match the upstream artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "False", alias = "false", alias = "FALSE", alias = "no")]
    False,
    #[serde(rename = "Maybe", alias = "maybe", alias = "MAYBE")]
    Maybe,
    #[serde(rename = "True", alias = "true", alias = "TRUE", alias = "yes")]
    True,
    #[serde(rename = "missing", alias = "Missing", alias = "MISSING")]
    Missing,
}

impl Label {
    /// True and Maybe carry positive evidence.
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::True | Self::Maybe)
    }

    /// Lenient parse used for external verdicts; unknown inputs fall back
    /// to False, absent inputs to Missing.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "true" | "t" | "yes" => Self::True,
            "maybe" => Self::Maybe,
            "missing" | "" => Self::Missing,
            _ => Self::False,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::False => "False",
            Self::Maybe => "Maybe",
            Self::True => "True",
            Self::Missing => "missing",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Enrichment row
// ============================================================================

/// One output row per ad: exposure fields, the AI-requirement label and the
/// matched spans for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentRow {
    pub ad_id: String,
    pub year: Option<i32>,
    pub occupation_code: Option<String>,
    pub industry_code: Option<String>,
    #[serde(flatten)]
    pub exposure: ExposureRecord,
    pub ai_requirement: Label,
    pub matches: Vec<MatchSpan>,
}
