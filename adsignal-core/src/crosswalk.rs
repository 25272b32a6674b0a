//! Immutable crosswalk store.
//!
//! All reference tables are loaded once at startup from CSV files and are
//! read-only for the rest of the run. Backing maps are `BTreeMap` so every
//! enumeration is deterministic; equal-weight ties downstream resolve by
//! lexical target order for free.
//!
//! A code that is simply unmapped yields an empty lookup result, never an
//! error. Malformed tables (conflicting duplicate rows, negative weights,
//! weight sums outside (0, 1]) fail the load before any record is touched.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use adsignal_common::{Error, Result, ResultExt};

/// Tolerance when checking that per-source weights sum to at most 1.
const WEIGHT_SUM_EPS: f64 = 1e-6;

// ============================================================================
// Rows
// ============================================================================

/// One target row of a crosswalk entry: where a source code maps to, the
/// exposure carried by that target, and an optional employment-share weight.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRow {
    pub target: String,
    pub label: Option<String>,
    pub exposure: f64,
    pub weight: Option<f64>,
}

/// Section mapping for one NOGA 2-digit code. Combined section classes
/// ("AB") are distinct codes and are never split.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub section: String,
    pub label: Option<String>,
}

/// Which exposure table a lookup addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Occupation exposure, keyed by the ad's most granular occupation code
    Occupation,
    /// Industry exposure, keyed by NOGA 2-digit
    IndustryNoga2,
    /// Industry exposure, keyed by NOGA section
    IndustrySection,
}

// ============================================================================
// Sources
// ============================================================================

/// File locations for one store load.
#[derive(Debug, Clone)]
pub struct CrosswalkSources {
    pub occupation_exposure: PathBuf,
    pub industry_exposure: PathBuf,
    pub noga_sections: PathBuf,
    pub section_exposure: PathBuf,
    pub isco_major_labels: PathBuf,
    pub isco_submajor_labels: PathBuf,
}

impl CrosswalkSources {
    /// Conventional file names under one reference directory.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            occupation_exposure: dir.join("occupation_exposure.csv"),
            industry_exposure: dir.join("industry_exposure.csv"),
            noga_sections: dir.join("noga_sections.csv"),
            section_exposure: dir.join("section_exposure.csv"),
            isco_major_labels: dir.join("isco_major_labels.csv"),
            isco_submajor_labels: dir.join("isco_submajor_labels.csv"),
        }
    }
}

// ============================================================================
// CSV row shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExposureCsvRow {
    source: String,
    target: String,
    #[serde(default)]
    label: Option<String>,
    exposure: f64,
    #[serde(default)]
    weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SectionCsvRow {
    noga_2digit: String,
    section: String,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelCsvRow {
    code: String,
    label: String,
}

// ============================================================================
// Store
// ============================================================================

/// Process-wide lookup tables, immutable after [`CrosswalkStore::load`].
///
/// `Send + Sync` without interior mutability: concurrent readers never
/// observe partial state.
#[derive(Debug)]
pub struct CrosswalkStore {
    occupation: BTreeMap<String, Vec<TargetRow>>,
    industry: BTreeMap<String, Vec<TargetRow>>,
    sections: BTreeMap<String, SectionRow>,
    section_exposure: BTreeMap<String, Vec<TargetRow>>,
    isco_major_labels: BTreeMap<String, String>,
    isco_submajor_labels: BTreeMap<String, String>,
}

impl CrosswalkStore {
    /// Load and validate all reference tables.
    pub fn load(sources: &CrosswalkSources) -> Result<Self> {
        let store = Self {
            occupation: load_exposure_table(&sources.occupation_exposure)
                .context("loading occupation exposure table")?,
            industry: load_exposure_table(&sources.industry_exposure)
                .context("loading industry exposure table")?,
            sections: load_section_table(&sources.noga_sections)
                .context("loading NOGA section table")?,
            section_exposure: load_exposure_table(&sources.section_exposure)
                .context("loading section exposure table")?,
            isco_major_labels: load_label_table(&sources.isco_major_labels)
                .context("loading ISCO major labels")?,
            isco_submajor_labels: load_label_table(&sources.isco_submajor_labels)
                .context("loading ISCO sub-major labels")?,
        };
        tracing::info!(
            occupation_codes = store.occupation.len(),
            industry_codes = store.industry.len(),
            sections = store.section_exposure.len(),
            "Crosswalk store loaded"
        );
        Ok(store)
    }

    /// Target rows for a source code. Empty slice when unmapped.
    pub fn lookup(&self, code: &str, granularity: Granularity) -> &[TargetRow] {
        let table = match granularity {
            Granularity::Occupation => &self.occupation,
            Granularity::IndustryNoga2 => &self.industry,
            Granularity::IndustrySection => &self.section_exposure,
        };
        table.get(code).map_or(&[], Vec::as_slice)
    }

    /// Section class for a NOGA 2-digit code.
    pub fn section_of(&self, noga2: &str) -> Option<&SectionRow> {
        self.sections.get(noga2)
    }

    /// English label for an ISCO major (1-digit) group.
    pub fn isco_major_label(&self, code: &str) -> Option<&str> {
        self.isco_major_labels.get(code).map(String::as_str)
    }

    /// English label for an ISCO sub-major (2-digit) group.
    pub fn isco_submajor_label(&self, code: &str) -> Option<&str> {
        self.isco_submajor_labels.get(code).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        occupation: BTreeMap<String, Vec<TargetRow>>,
        industry: BTreeMap<String, Vec<TargetRow>>,
        sections: BTreeMap<String, SectionRow>,
        section_exposure: BTreeMap<String, Vec<TargetRow>>,
    ) -> Self {
        Self {
            occupation,
            industry,
            sections,
            section_exposure,
            isco_major_labels: BTreeMap::new(),
            isco_submajor_labels: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Loading and validation
// ============================================================================

fn open_csv(path: &Path) -> Result<csv::Reader<File>> {
    let file = File::open(path).map_err(|e| {
        Error::Crosswalk(format!("missing reference file {}: {e}", path.display()))
    })?;
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file))
}

fn load_exposure_table(path: &Path) -> Result<BTreeMap<String, Vec<TargetRow>>> {
    let mut reader = open_csv(path)?;
    let mut table: BTreeMap<String, Vec<TargetRow>> = BTreeMap::new();

    for (idx, row) in reader.deserialize::<ExposureCsvRow>().enumerate() {
        let row = row.map_err(|e| {
            Error::Crosswalk(format!("{}: row {}: {e}", path.display(), idx + 2))
        })?;
        if let Some(w) = row.weight {
            if w < 0.0 {
                return Err(Error::Crosswalk(format!(
                    "{}: negative weight {w} for source '{}'",
                    path.display(),
                    row.source
                )));
            }
        }
        let entry = TargetRow {
            target: row.target,
            label: row.label,
            exposure: row.exposure,
            weight: row.weight,
        };
        let rows = table.entry(row.source).or_default();
        if let Some(existing) = rows.iter().find(|r| r.target == entry.target) {
            if *existing != entry {
                return Err(Error::Crosswalk(format!(
                    "{}: conflicting duplicate for target '{}'",
                    path.display(),
                    entry.target
                )));
            }
            continue; // identical duplicate, drop silently
        }
        rows.push(entry);
    }

    for (source, rows) in &mut table {
        validate_weights(path, source, rows)?;
        // deterministic target order; downstream ties break lexically
        rows.sort_by(|a, b| a.target.cmp(&b.target));
    }

    // an empty target list is indistinguishable from an absent code
    table.retain(|_, rows| !rows.is_empty());
    Ok(table)
}

/// Per-source weights must be all-present or all-absent, and when present
/// must sum to a value in (0, 1].
fn validate_weights(path: &Path, source: &str, rows: &[TargetRow]) -> Result<()> {
    let weighted = rows.iter().filter(|r| r.weight.is_some()).count();
    if weighted == 0 {
        return Ok(());
    }
    if weighted != rows.len() {
        return Err(Error::Crosswalk(format!(
            "{}: source '{source}' mixes weighted and unweighted targets",
            path.display()
        )));
    }
    let sum: f64 = rows.iter().filter_map(|r| r.weight).sum();
    if sum <= 0.0 || sum > 1.0 + WEIGHT_SUM_EPS {
        return Err(Error::Crosswalk(format!(
            "{}: weights for source '{source}' sum to {sum}, expected (0, 1]",
            path.display()
        )));
    }
    Ok(())
}

fn load_section_table(path: &Path) -> Result<BTreeMap<String, SectionRow>> {
    let mut reader = open_csv(path)?;
    let mut table: BTreeMap<String, SectionRow> = BTreeMap::new();

    for (idx, row) in reader.deserialize::<SectionCsvRow>().enumerate() {
        let row = row.map_err(|e| {
            Error::Crosswalk(format!("{}: row {}: {e}", path.display(), idx + 2))
        })?;
        let entry = SectionRow {
            section: row.section,
            label: row.label,
        };
        if let Some(existing) = table.get(&row.noga_2digit) {
            if *existing != entry {
                return Err(Error::Crosswalk(format!(
                    "{}: NOGA code '{}' maps to both section '{}' and '{}'",
                    path.display(),
                    row.noga_2digit,
                    existing.section,
                    entry.section
                )));
            }
            continue;
        }
        table.insert(row.noga_2digit, entry);
    }
    Ok(table)
}

fn load_label_table(path: &Path) -> Result<BTreeMap<String, String>> {
    let mut reader = open_csv(path)?;
    let mut table = BTreeMap::new();
    for (idx, row) in reader.deserialize::<LabelCsvRow>().enumerate() {
        let row = row.map_err(|e| {
            Error::Crosswalk(format!("{}: row {}: {e}", path.display(), idx + 2))
        })?;
        table.insert(row.code, row.label);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, content: &str) {
        let mut f = File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn seed_minimal(dir: &Path) {
        write_csv(
            dir,
            "occupation_exposure.csv",
            "source,target,label,exposure,weight\n2511,15-1252,Software Developers,1.2,\n",
        );
        write_csv(
            dir,
            "industry_exposure.csv",
            "source,target,label,exposure,weight\n25,2512,,0.5,0.6\n25,2513,,0.9,0.4\n62,6201,,1.1,\n",
        );
        write_csv(
            dir,
            "noga_sections.csv",
            "noga_2digit,section,label\n25,C,Manufacturing\n01,AB,Agriculture and mining\n",
        );
        write_csv(
            dir,
            "section_exposure.csv",
            "source,target,label,exposure,weight\nC,25,,0.42,1.0\n",
        );
        write_csv(dir, "isco_major_labels.csv", "code,label\n2,Professionals\n");
        write_csv(
            dir,
            "isco_submajor_labels.csv",
            "code,label\n25,ICT professionals\n",
        );
    }

    #[test]
    fn test_load_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        seed_minimal(dir.path());
        let store = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap();

        let rows = store.lookup("25", Granularity::IndustryNoga2);
        assert_eq!(rows.len(), 2);
        // lexical target order
        assert_eq!(rows[0].target, "2512");
        assert_eq!(rows[1].target, "2513");

        assert!(store.lookup("99", Granularity::IndustryNoga2).is_empty());
        assert_eq!(store.section_of("25").unwrap().section, "C");
        assert_eq!(store.section_of("01").unwrap().section, "AB");
        assert_eq!(store.isco_major_label("2"), Some("Professionals"));
    }

    #[test]
    fn test_missing_file_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap_err();
        assert!(err.is_load_failure());
        // the context names which table failed
        assert!(err.to_string().contains("occupation exposure table"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_minimal(dir.path());
        write_csv(
            dir.path(),
            "industry_exposure.csv",
            "source,target,label,exposure,weight\n25,2512,,0.5,-0.1\n",
        );
        let err = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap_err();
        assert!(err.to_string().contains("negative weight"));
    }

    #[test]
    fn test_weight_sum_out_of_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_minimal(dir.path());
        write_csv(
            dir.path(),
            "industry_exposure.csv",
            "source,target,label,exposure,weight\n25,2512,,0.5,0.9\n25,2513,,0.9,0.9\n",
        );
        let err = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap_err();
        assert!(err.to_string().contains("sum"));
    }

    #[test]
    fn test_conflicting_duplicate_rejected_identical_duplicate_dropped() {
        let dir = tempfile::tempdir().unwrap();
        seed_minimal(dir.path());
        // identical duplicate is fine
        write_csv(
            dir.path(),
            "occupation_exposure.csv",
            "source,target,label,exposure,weight\n2511,15-1252,,1.2,\n2511,15-1252,,1.2,\n",
        );
        let store = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap();
        assert_eq!(store.lookup("2511", Granularity::Occupation).len(), 1);

        // conflicting duplicate is not
        write_csv(
            dir.path(),
            "occupation_exposure.csv",
            "source,target,label,exposure,weight\n2511,15-1252,,1.2,\n2511,15-1252,,9.9,\n",
        );
        let err = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap_err();
        assert!(err.to_string().contains("conflicting duplicate"));
    }

    #[test]
    fn test_mixed_weights_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_minimal(dir.path());
        write_csv(
            dir.path(),
            "industry_exposure.csv",
            "source,target,label,exposure,weight\n25,2512,,0.5,0.6\n25,2513,,0.9,\n",
        );
        let err = CrosswalkStore::load(&CrosswalkSources::from_dir(dir.path())).unwrap_err();
        assert!(err.to_string().contains("mixes weighted"));
    }
}
