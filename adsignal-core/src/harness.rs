//! Validation harness for the keyword classification engine.
//!
//! Replays the engine against a curated labeled corpus and reports false
//! positives/negatives. This is the regression safety net when matching
//! rules change; it runs offline and never touches the production path.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use adsignal_common::{Error, Result};

use crate::keyword::KeywordEngine;
use crate::record::{Label, Polarity};

/// One labeled case: an input string, its expected label, and optionally
/// the terms a correct run must find.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledCase {
    pub text: String,
    pub expected: Label,
    #[serde(default)]
    pub expect_terms: Vec<String>,
}

/// A case where the engine disagreed with the corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mismatch {
    pub text: String,
    pub expected: Label,
    pub actual: Label,
    /// Confirming terms the engine found
    pub found_terms: Vec<String>,
    /// Expected terms the engine did not find
    pub missing_terms: Vec<String>,
}

/// Harness result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub mismatched_cases: Vec<Mismatch>,
}

impl Report {
    /// No disagreements at all.
    pub fn is_clean(&self) -> bool {
        self.false_positives == 0
            && self.false_negatives == 0
            && self.mismatched_cases.is_empty()
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "tp={} fp={} fn={} mismatches={}",
            self.true_positives,
            self.false_positives,
            self.false_negatives,
            self.mismatched_cases.len()
        )
    }
}

// ============================================================================
// Corpus loading
// ============================================================================

/// The corpus file layout: positive and negative entries.
#[derive(Debug, Deserialize)]
struct CorpusFile {
    #[serde(default)]
    positives: Vec<CorpusEntry>,
    #[serde(default)]
    negatives: Vec<CorpusEntry>,
}

#[derive(Debug, Deserialize)]
struct CorpusEntry {
    text: String,
    /// Expected confirming terms (positives only)
    #[serde(default)]
    expect: Vec<String>,
    /// Explicit expected label; defaults to True for positives, False for
    /// negatives
    #[serde(default)]
    label: Option<Label>,
}

/// Load the labeled corpus. A missing or malformed corpus is a load
/// failure: the harness is pointless without its ground truth.
pub fn load_corpus(path: &Path) -> Result<Vec<LabeledCase>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Corpus(format!("cannot read {}: {e}", path.display())))?;
    let file: CorpusFile = serde_json::from_str(&raw)
        .map_err(|e| Error::Corpus(format!("invalid corpus {}: {e}", path.display())))?;
    if file.positives.is_empty() && file.negatives.is_empty() {
        return Err(Error::Corpus(format!("{} holds no cases", path.display())));
    }

    let mut cases = Vec::with_capacity(file.positives.len() + file.negatives.len());
    for entry in file.positives {
        cases.push(LabeledCase {
            text: entry.text,
            expected: entry.label.unwrap_or(Label::True),
            expect_terms: entry.expect,
        });
    }
    for entry in file.negatives {
        cases.push(LabeledCase {
            text: entry.text,
            expected: entry.label.unwrap_or(Label::False),
            expect_terms: Vec::new(),
        });
    }
    Ok(cases)
}

// ============================================================================
// Evaluation
// ============================================================================

/// Replay the engine against the corpus. Pure comparison: the engine is
/// never mutated.
///
/// Scoring: an expected-positive case counts as a true positive when the
/// actual label is positive and every expected term was found; an actual
/// negative there is a false negative. An expected-negative case with a
/// positive actual label is a false positive. A True/Maybe disagreement on
/// a positive case is recorded as a mismatch without counting as a false
/// negative.
pub fn evaluate(engine: &KeywordEngine, cases: &[LabeledCase]) -> Report {
    let mut report = Report::default();

    for case in cases {
        let result = engine.classify(&case.text);
        let found_terms: Vec<String> = result
            .spans
            .iter()
            .filter(|s| s.polarity == Polarity::Confirmed)
            .map(|s| s.term.clone())
            .collect();
        let missing_terms: Vec<String> = case
            .expect_terms
            .iter()
            .filter(|t| !found_terms.iter().any(|f| f.eq_ignore_ascii_case(t)))
            .cloned()
            .collect();

        let expected_positive = case.expected.is_positive();
        let actual_positive = result.label.is_positive();

        if expected_positive {
            if actual_positive && missing_terms.is_empty() {
                report.true_positives += 1;
                if result.label != case.expected {
                    // right direction, wrong confidence: surface it
                    report.mismatched_cases.push(Mismatch {
                        text: case.text.clone(),
                        expected: case.expected,
                        actual: result.label,
                        found_terms,
                        missing_terms,
                    });
                }
            } else {
                if !actual_positive {
                    report.false_negatives += 1;
                }
                report.mismatched_cases.push(Mismatch {
                    text: case.text.clone(),
                    expected: case.expected,
                    actual: result.label,
                    found_terms,
                    missing_terms,
                });
            }
        } else if actual_positive {
            report.false_positives += 1;
            report.mismatched_cases.push(Mismatch {
                text: case.text.clone(),
                expected: case.expected,
                actual: result.label,
                found_terms,
                missing_terms,
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn engine() -> KeywordEngine {
        KeywordEngine::builtin().unwrap()
    }

    fn case(text: &str, expected: Label) -> LabeledCase {
        LabeledCase {
            text: text.into(),
            expected,
            expect_terms: Vec::new(),
        }
    }

    #[test]
    fn test_clean_corpus() {
        let cases = vec![
            case("machine learning engineer wanted", Label::True),
            case("data mining experience helpful", Label::Maybe),
            case("seeking a pastry chef", Label::False),
        ];
        let report = evaluate(&engine(), &cases);
        assert!(report.is_clean(), "{}", report.summary());
        assert_eq!(report.true_positives, 2);
    }

    #[test]
    fn test_single_intentional_mismatch_is_identified() {
        let cases = vec![
            case("machine learning engineer wanted", Label::True),
            // intentionally mislabeled: no AI content but expected positive
            case("seeking a pastry chef", Label::True),
        ];
        let report = evaluate(&engine(), &cases);
        assert_eq!(report.false_negatives, 1);
        assert_eq!(report.false_positives, 0);
        assert_eq!(report.mismatched_cases.len(), 1);
        assert_eq!(report.mismatched_cases[0].text, "seeking a pastry chef");
        assert_eq!(report.mismatched_cases[0].actual, Label::False);
    }

    #[test]
    fn test_false_positive_counted() {
        let cases = vec![case("our machine learning stack", Label::False)];
        let report = evaluate(&engine(), &cases);
        assert_eq!(report.false_positives, 1);
        assert_eq!(report.false_negatives, 0);
    }

    #[test]
    fn test_missing_expected_term_is_mismatch() {
        let cases = vec![LabeledCase {
            text: "deep learning role".into(),
            expected: Label::True,
            expect_terms: vec!["pytorch".into()],
        }];
        let report = evaluate(&engine(), &cases);
        // label direction is right but the expected term is absent
        assert_eq!(report.true_positives, 0);
        assert_eq!(report.false_negatives, 0);
        assert_eq!(report.mismatched_cases.len(), 1);
        assert_eq!(report.mismatched_cases[0].missing_terms, vec!["pytorch"]);
    }

    #[test]
    fn test_confidence_disagreement_recorded_not_counted() {
        // engine says True, corpus says Maybe
        let cases = vec![case("machine learning required", Label::Maybe)];
        let report = evaluate(&engine(), &cases);
        assert_eq!(report.true_positives, 1);
        assert_eq!(report.false_negatives, 0);
        assert_eq!(report.mismatched_cases.len(), 1);
    }

    #[test]
    fn test_corpus_round_trip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "positives": [
                    {{"text": "ML engineer", "expect": ["ML"]}},
                    {{"text": "data mining role", "label": "Maybe"}}
                ],
                "negatives": [
                    {{"text": "florist wanted"}}
                ]
            }}"#
        )
        .unwrap();
        let cases = load_corpus(f.path()).unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].expected, Label::True);
        assert_eq!(cases[0].expect_terms, vec!["ML"]);
        assert_eq!(cases[1].expected, Label::Maybe);
        assert_eq!(cases[2].expected, Label::False);

        let report = evaluate(&engine(), &cases);
        assert!(report.is_clean(), "{}", report.summary());
    }

    #[test]
    fn test_missing_corpus_is_load_failure() {
        let err = load_corpus(Path::new("/nonexistent/cases.json")).unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{}}").unwrap();
        assert!(load_corpus(f.path()).is_err());
    }
}
