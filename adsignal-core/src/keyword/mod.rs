//! Keyword classification engine.
//!
//! Scans ad text for AI-related vocabulary, negates matches that sit in an
//! exclusion context, and aggregates the surviving evidence into a
//! [`Label`]. Pure and deterministic: identical text and rule set always
//! yield the identical label and span set.
//!
//! Matching is word-boundary-aware and case-insensitive, with two
//! refinements carried over from the curated rules:
//! - short all-caps acronyms (AI, KI, ML, LLM, NLP, RPA) match
//!   case-sensitively, standalone or followed by a hyphen/slash/lowercase
//!   continuation ("AI-powered", "KIgestützt", "LLMs");
//! - "künstliche intelligenz" matches its German adjectival endings.
//!
//! Unicode dashes are normalized to ASCII before matching; span offsets
//! index the normalized text.

mod rules;

pub use rules::{ConfirmingTerm, RuleSet, Strength, DEFAULT_WINDOW};

use aho_corasick::AhoCorasick;
use regex::Regex;

use adsignal_common::{Error, Result};

use crate::record::{Label, MatchSpan, Polarity};

/// Classification result: the aggregate label plus every span for audit,
/// excluded ones included.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub spans: Vec<MatchSpan>,
}

/// Replace Unicode hyphens/dashes with ASCII so compound forms like
/// "AI‑gestützt" match regardless of which dash the ad uses.
pub fn normalize_dashes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            other => other,
        })
        .collect()
}

/// One compiled pattern variant for a term. `trim` marks variants that
/// consume one continuation character beyond the term itself.
struct PatternVariant {
    regex: Regex,
    trim: bool,
}

struct CompiledTerm {
    term: String,
    strength: Strength,
    variants: Vec<PatternVariant>,
}

/// The compiled engine. Immutable after construction, `Send + Sync`.
pub struct KeywordEngine {
    terms: Vec<CompiledTerm>,
    exclusions: Vec<String>,
    exclusion_scanner: Option<AhoCorasick>,
    window: usize,
}

/// Short all-caps terms matched case-sensitively.
fn is_acronym(term: &str) -> bool {
    term.len() <= 4 && term.chars().all(|c| c.is_ascii_uppercase())
}

fn compile_term(entry: &ConfirmingTerm) -> Result<CompiledTerm> {
    let term = entry.term.trim().to_string();
    let mut variants = Vec::new();

    let push = |variants: &mut Vec<PatternVariant>, pattern: &str, trim: bool| -> Result<()> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::Rules(format!("term '{term}': bad pattern: {e}")))?;
        variants.push(PatternVariant { regex, trim });
        Ok(())
    };

    if is_acronym(&term) {
        let escaped = regex::escape(&term);
        // standalone, plus hyphen/slash compounds ("AI-powered", "AI/ML"):
        // a word boundary holds before '-' and '/'
        push(&mut variants, &format!(r"\b{escaped}\b"), false)?;
        // lowercase continuation ("AIenabled", "KIgestützt", "LLMs");
        // the regex crate has no lookahead, so consume the continuation
        // character and trim the span back to the term afterwards
        push(
            &mut variants,
            &format!(r"\b{escaped}[a-zäöüß]"),
            true,
        )?;
    } else if term.eq_ignore_ascii_case("künstliche intelligenz")
        || term.eq_ignore_ascii_case("kuenstliche intelligenz")
    {
        // adjectival endings: künstliche/künstlicher/künstlichen/…
        push(
            &mut variants,
            r"(?i)\bk[üu]nstlich(?:e|er|en|em|es)?\s+intelligenz\b",
            false,
        )?;
    } else {
        let escaped = regex::escape(&term);
        push(&mut variants, &format!(r"(?i)\b{escaped}\b"), false)?;
    }

    Ok(CompiledTerm {
        term,
        strength: entry.strength,
        variants,
    })
}

impl KeywordEngine {
    /// Compile a rule set into a matcher.
    pub fn new(rules: RuleSet) -> Result<Self> {
        rules.validate()?;

        let terms = rules
            .confirming
            .iter()
            .map(compile_term)
            .collect::<Result<Vec<_>>>()?;

        let exclusions: Vec<String> = rules
            .exclusions
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        // case-insensitive at the automaton level so hit offsets index the
        // same text the confirming spans do
        let exclusion_scanner = if exclusions.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(&exclusions)
                    .map_err(|e| Error::Rules(format!("bad exclusion set: {e}")))?,
            )
        };

        Ok(Self {
            terms,
            exclusions,
            exclusion_scanner,
            window: rules.window,
        })
    }

    /// Engine compiled from the built-in default rule set.
    pub fn builtin() -> Result<Self> {
        Self::new(RuleSet::builtin())
    }

    /// Classify one text. Malformed/empty text yields `Missing` with no
    /// spans, never an error.
    pub fn classify(&self, text: &str) -> Classification {
        if text.trim().is_empty() {
            return Classification {
                label: Label::Missing,
                spans: Vec::new(),
            };
        }

        let normalized = normalize_dashes(text);
        let mut spans = self.find_confirming(&normalized);
        self.apply_exclusions(&normalized, &mut spans);

        let label = aggregate(&spans);
        Classification { label, spans }
    }

    /// Absent text is `Missing`; present text goes through [`classify`].
    pub fn classify_opt(&self, text: Option<&str>) -> Classification {
        match text {
            Some(t) => self.classify(t),
            None => Classification {
                label: Label::Missing,
                spans: Vec::new(),
            },
        }
    }

    /// All confirming matches, deduplicated: variants of one term never
    /// double-count a position, and overlapping matches of different terms
    /// at the same position keep only the longest.
    fn find_confirming(&self, text: &str) -> Vec<MatchSpan> {
        let mut candidates: Vec<MatchSpan> = Vec::new();

        for compiled in &self.terms {
            let mut seen: Vec<(usize, usize)> = Vec::new();
            for variant in &compiled.variants {
                for m in variant.regex.find_iter(text) {
                    let start = m.start();
                    let end = if variant.trim {
                        start + compiled.term.len()
                    } else {
                        m.end()
                    };
                    if seen.contains(&(start, end)) {
                        continue;
                    }
                    seen.push((start, end));
                    candidates.push(MatchSpan {
                        start,
                        end,
                        term: compiled.term.clone(),
                        polarity: Polarity::Confirmed,
                        strength: compiled.strength,
                    });
                }
            }
        }

        // longest match wins at any shared position; ties by term for
        // reproducibility
        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(a.term.cmp(&b.term))
        });
        let mut kept: Vec<MatchSpan> = Vec::new();
        for span in candidates {
            let contained = kept
                .iter()
                .any(|k| k.start <= span.start && span.end <= k.end);
            if !contained {
                kept.push(span);
            }
        }
        kept
    }

    /// Flip the polarity of any confirming span whose surrounding window
    /// contains an exclusion context. Hits and spans index the same
    /// normalized text, so the window comparison is exact.
    fn apply_exclusions(&self, text: &str, spans: &mut [MatchSpan]) {
        let Some(scanner) = &self.exclusion_scanner else {
            return;
        };
        let hits: Vec<(usize, usize)> = scanner
            .find_overlapping_iter(text)
            .map(|m| (m.start(), m.end()))
            .collect();
        if hits.is_empty() {
            return;
        }

        for span in spans.iter_mut() {
            let lo = span.start.saturating_sub(self.window);
            let hi = (span.end + self.window).min(text.len());
            if hits.iter().any(|&(a, b)| a < hi && b > lo) {
                span.polarity = Polarity::Excluded;
            }
        }
    }

    /// Number of confirming terms in the active rule set.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Number of exclusion contexts in the active rule set.
    pub fn exclusion_count(&self) -> usize {
        self.exclusions.len()
    }
}

/// Monotone aggregation: any confirmed strong span → True; confirmed weak
/// only → Maybe; nothing confirmed → False.
fn aggregate(spans: &[MatchSpan]) -> Label {
    let mut label = Label::False;
    for span in spans {
        if span.polarity != Polarity::Confirmed {
            continue;
        }
        match span.strength {
            Strength::Strong => return Label::True,
            Strength::Weak => label = Label::Maybe,
        }
    }
    label
}
