//! Keyword rule sets.
//!
//! The rule data is external and editable: a JSON file with confirming
//! terms (each carrying a static strength) and exclusion contexts. A
//! built-in set distilled from the project's curated term list ships as the
//! default. Strength is fixed at rule-authoring time, never inferred at
//! match time.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use adsignal_common::{Error, Result};

/// Default context window, in bytes each side of a confirming match, that
/// is scanned for exclusion contexts.
pub const DEFAULT_WINDOW: usize = 60;

/// Static strength of a confirming term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    /// Ambiguous vocabulary; caps the label at Maybe
    Weak,
    /// Unambiguous AI/ML vocabulary; promotes the label to True
    Strong,
}

/// One confirming term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmingTerm {
    pub term: String,
    pub strength: Strength,
}

/// A complete rule set: confirming terms plus exclusion contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Exclusion scan window in bytes each side of a match
    #[serde(default = "default_window")]
    pub window: usize,

    /// Confirming AI/ML vocabulary, multilingual
    pub confirming: Vec<ConfirmingTerm>,

    /// Contexts that negate a nearby confirming match (proper nouns,
    /// false-positive idioms, cross-domain homonyms)
    #[serde(default)]
    pub exclusions: Vec<String>,
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}

impl RuleSet {
    /// Load a rule set from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Rules(format!("cannot read {}: {e}", path.display())))?;
        let rules: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Rules(format!("invalid rule file {}: {e}", path.display())))?;
        rules.validate()?;
        Ok(rules)
    }

    /// The built-in default rule set.
    pub fn builtin() -> Self {
        fn strong(term: &str) -> ConfirmingTerm {
            ConfirmingTerm {
                term: term.into(),
                strength: Strength::Strong,
            }
        }
        fn weak(term: &str) -> ConfirmingTerm {
            ConfirmingTerm {
                term: term.into(),
                strength: Strength::Weak,
            }
        }

        let rules = Self {
            window: DEFAULT_WINDOW,
            confirming: vec![
                // explicit AI/ML vocabulary
                strong("artificial intelligence"),
                strong("künstliche intelligenz"),
                strong("intelligence artificielle"),
                strong("AI"),
                strong("KI"),
                strong("machine learning"),
                strong("maschinelles lernen"),
                strong("ML"),
                strong("deep learning"),
                strong("neural network"),
                strong("neural networks"),
                strong("neuronale netze"),
                strong("data science"),
                strong("natural language processing"),
                strong("NLP"),
                strong("sentiment analysis"),
                strong("computer vision"),
                strong("image recognition"),
                strong("speech recognition"),
                strong("anomaly detection"),
                strong("predictive maintenance"),
                strong("generative ai"),
                strong("large language model"),
                strong("large language models"),
                strong("LLM"),
                strong("chatgpt"),
                strong("recommender system"),
                strong("recommendation system"),
                strong("tensorflow"),
                strong("pytorch"),
                strong("scikit-learn"),
                strong("keras"),
                // AI-adjacent vocabulary: sometimes AI, not necessarily
                weak("data mining"),
                weak("robotics"),
                weak("robotik"),
                weak("robot control"),
                weak("signal processing"),
                weak("predictive analytics"),
                weak("robotic process automation"),
                weak("RPA"),
            ],
            exclusions: vec![
                // proper nouns and cross-domain homonyms
                "machine learning center".into(),
                "machine learning centre".into(),
                "adobe illustrator".into(),
            ],
        };
        debug_assert!(rules.validate().is_ok());
        rules
    }

    /// Reject empty or self-contradictory rule sets.
    pub fn validate(&self) -> Result<()> {
        if self.confirming.is_empty() {
            return Err(Error::Rules("no confirming terms".into()));
        }
        for entry in &self.confirming {
            if entry.term.trim().is_empty() {
                return Err(Error::Rules("blank confirming term".into()));
            }
            // the sets must stay disjoint; an exclusion may contain a
            // confirming term ("machine learning center"), but never equal one
            if self
                .exclusions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&entry.term))
            {
                return Err(Error::Rules(format!(
                    "term '{}' is both confirming and excluded",
                    entry.term
                )));
            }
        }
        if self.window == 0 {
            return Err(Error::Rules("window must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_validates() {
        let rules = RuleSet::builtin();
        assert!(rules.validate().is_ok());
        assert!(rules
            .confirming
            .iter()
            .any(|t| t.term == "machine learning" && t.strength == Strength::Strong));
        assert!(rules
            .confirming
            .iter()
            .any(|t| t.term == "data mining" && t.strength == Strength::Weak));
    }

    #[test]
    fn test_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "confirming": [
                    {{"term": "machine learning", "strength": "strong"}},
                    {{"term": "data mining", "strength": "weak"}}
                ],
                "exclusions": ["machine learning center"]
            }}"#
        )
        .unwrap();
        let rules = RuleSet::from_file(f.path()).unwrap();
        assert_eq!(rules.window, DEFAULT_WINDOW);
        assert_eq!(rules.confirming.len(), 2);
    }

    #[test]
    fn test_missing_file_is_load_failure() {
        let err = RuleSet::from_file(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let rules = RuleSet {
            window: DEFAULT_WINDOW,
            confirming: vec![ConfirmingTerm {
                term: "AI".into(),
                strength: Strength::Strong,
            }],
            exclusions: vec!["ai".into()],
        };
        assert!(rules.validate().is_err());
    }
}
