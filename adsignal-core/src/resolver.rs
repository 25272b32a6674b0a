//! Exposure resolver.
//!
//! Pure mapping from an ad's occupation and industry codes to exposure
//! scores at three granularities. Missingness is expected: every step that
//! finds zero target rows leaves its field `None` and moves on.

use crate::crosswalk::{CrosswalkStore, Granularity, TargetRow};
use crate::record::{AdRecord, ExposureRecord};

/// Employment-share-weighted mean: Σwᵢxᵢ / Σwᵢ.
///
/// Present iff the rows carry weights (the store guarantees all-or-none per
/// source). Never derived from the unweighted mean.
fn weighted_mean(rows: &[TargetRow]) -> Option<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for row in rows {
        let w = row.weight?;
        num += w * row.exposure;
        den += w;
    }
    if den > 0.0 {
        Some(num / den)
    } else {
        None
    }
}

/// Plain arithmetic mean over target rows; diagnostic use only.
fn unweighted_mean(rows: &[TargetRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let sum: f64 = rows.iter().map(|r| r.exposure).sum();
    Some(sum / rows.len() as f64)
}

/// Occupation exposure takes whichever aggregation the table supports:
/// weighted when the crosswalk carries part weights, plain mean otherwise.
fn occupation_mean(rows: &[TargetRow]) -> Option<f64> {
    weighted_mean(rows).or_else(|| unweighted_mean(rows))
}

/// Resolve one ad to its [`ExposureRecord`].
///
/// Occupation exposure uses the ad's most granular code only; an unmapped
/// code stays missing rather than being approximated from a coarser
/// grouping. Industry exposure is resolved at the 2-digit code and again at
/// the section class the crosswalk assigns to that code.
pub fn resolve(store: &CrosswalkStore, ad: &AdRecord) -> ExposureRecord {
    let mut out = ExposureRecord::default();

    // 1. occupation: no coarsening fallback
    if let Some(code) = ad.occupation_code.as_deref() {
        let rows = store.lookup(code, Granularity::Occupation);
        out.occupation_exposure = occupation_mean(rows);
        out.occupation_source_count = rows.len();
    }

    if let Some(code) = ad.industry_code.as_deref() {
        // 2 + 3. industry at the 2-digit code
        let rows = store.lookup(code, Granularity::IndustryNoga2);
        out.industry_exposure = unweighted_mean(rows);
        out.industry_exposure_weighted = weighted_mean(rows);
        out.industry_contribution_count = rows.len();

        // 4. section class, then section-scoped exposure
        if let Some(section) = store.section_of(code) {
            out.industry_section = Some(section.section.clone());
            out.industry_section_label = section.label.clone();

            let rows = store.lookup(&section.section, Granularity::IndustrySection);
            out.industry_section_exposure = unweighted_mean(rows);
            out.industry_section_exposure_weighted = weighted_mean(rows);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crosswalk::SectionRow;
    use crate::record::OccupationLevel;
    use std::collections::BTreeMap;

    fn row(target: &str, exposure: f64, weight: Option<f64>) -> TargetRow {
        TargetRow {
            target: target.into(),
            label: None,
            exposure,
            weight,
        }
    }

    fn ad(occupation: Option<&str>, industry: Option<&str>) -> AdRecord {
        AdRecord {
            ad_id: "ad-1".into(),
            year: Some(2020),
            occupation_code: occupation.map(String::from),
            occupation_level: OccupationLevel::Isco4,
            industry_code: industry.map(String::from),
            text: None,
            source: None,
        }
    }

    fn fixture_store() -> CrosswalkStore {
        let mut occupation = BTreeMap::new();
        occupation.insert("2511".to_string(), vec![row("15-1252", 1.2, None)]);

        let mut industry = BTreeMap::new();
        industry.insert(
            "25".to_string(),
            vec![row("2512", 0.5, Some(0.6)), row("2513", 0.9, Some(0.4))],
        );
        industry.insert("62".to_string(), vec![row("6201", 1.1, None)]);

        let mut sections = BTreeMap::new();
        sections.insert(
            "25".to_string(),
            SectionRow {
                section: "C".into(),
                label: Some("Manufacturing".into()),
            },
        );

        let mut section_exposure = BTreeMap::new();
        section_exposure.insert("C".to_string(), vec![row("25", 0.42, Some(1.0))]);

        CrosswalkStore::from_parts(occupation, industry, sections, section_exposure)
    }

    #[test]
    fn test_weighted_mean_is_share_weighted_not_simple() {
        let store = fixture_store();
        let rec = resolve(&store, &ad(None, Some("25")));
        // 0.6*0.5 + 0.4*0.9 = 0.66, not (0.5+0.9)/2
        assert!((rec.industry_exposure_weighted.unwrap() - 0.66).abs() < 1e-12);
        assert!((rec.industry_exposure.unwrap() - 0.70).abs() < 1e-12);
        assert_eq!(rec.industry_contribution_count, 2);
    }

    #[test]
    fn test_section_scenario() {
        let store = fixture_store();
        let rec = resolve(&store, &ad(None, Some("25")));
        assert_eq!(rec.industry_section.as_deref(), Some("C"));
        assert_eq!(rec.industry_section_label.as_deref(), Some("Manufacturing"));
        assert!((rec.industry_section_exposure_weighted.unwrap() - 0.42).abs() < 1e-12);
    }

    #[test]
    fn test_unweighted_table_has_no_weighted_value() {
        let store = fixture_store();
        let rec = resolve(&store, &ad(None, Some("62")));
        assert_eq!(rec.industry_exposure, Some(1.1));
        assert_eq!(rec.industry_exposure_weighted, None);
        // 62 has no section mapping in the fixture
        assert_eq!(rec.industry_section, None);
        assert_eq!(rec.industry_section_exposure_weighted, None);
    }

    #[test]
    fn test_unmapped_occupation_is_missing_not_error() {
        let store = fixture_store();
        let rec = resolve(&store, &ad(Some("9999"), None));
        assert_eq!(rec.occupation_exposure, None);
        assert_eq!(rec.occupation_source_count, 0);
    }

    #[test]
    fn test_mapped_occupation() {
        let store = fixture_store();
        let rec = resolve(&store, &ad(Some("2511"), None));
        assert_eq!(rec.occupation_exposure, Some(1.2));
        assert_eq!(rec.occupation_source_count, 1);
    }

    #[test]
    fn test_absent_codes_leave_everything_missing() {
        let store = fixture_store();
        let rec = resolve(&store, &ad(None, None));
        assert_eq!(rec, ExposureRecord::default());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let store = fixture_store();
        let a = resolve(&store, &ad(Some("2511"), Some("25")));
        let b = resolve(&store, &ad(Some("2511"), Some("25")));
        assert_eq!(a, b);
    }

    #[test]
    fn test_weighted_mean_order_invariant() {
        let fwd = vec![row("a", 0.5, Some(0.6)), row("b", 0.9, Some(0.4))];
        let rev = vec![row("b", 0.9, Some(0.4)), row("a", 0.5, Some(0.6))];
        assert_eq!(weighted_mean(&fwd), weighted_mean(&rev));
    }
}
