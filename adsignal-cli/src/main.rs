#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

mod io;

use adsignal_common::{init_logging, Config};
use adsignal_core::{
    enrich_records_with_stats, evaluate, load_corpus, AdRecord, CrosswalkSources, CrosswalkStore,
    EnrichmentRow, KeywordEngine, RecordFilter, RuleSet,
};
use adsignal_llm::{ReviewClient, ReviewItem};

/// `adsignal` - AI-exposure enrichment for job-advertisement records.
#[derive(Parser, Debug)]
#[command(name = "adsignal")]
#[command(version = "0.1.0")]
#[command(about = "Attach AI-exposure scores and AI-requirement labels to job ads", long_about = None)]
struct Cli {
    /// Configuration file (JSON); defaults + environment when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enrich ad records with exposure scores and keyword labels
    Enrich {
        /// Input ads (JSONL, one record per line)
        #[arg(long)]
        input: PathBuf,

        /// Output file (JSONL, one enrichment row per line)
        #[arg(long)]
        output: PathBuf,

        /// Crosswalk CSV directory; overrides the configured path
        #[arg(long)]
        crosswalks: Option<PathBuf>,

        /// Keyword rule file (JSON); overrides the configured path
        #[arg(long)]
        rules: Option<PathBuf>,

        /// First posting year to include (inclusive)
        #[arg(long)]
        start_year: Option<i32>,

        /// Last posting year to include (inclusive)
        #[arg(long)]
        end_year: Option<i32>,

        /// Restrict to one ad source (press, portal, company site)
        #[arg(long)]
        source: Option<String>,
    },

    /// Replay the keyword engine against the labeled corpus
    Validate {
        /// Labeled corpus (JSON); overrides the configured path
        #[arg(long)]
        cases: Option<PathBuf>,

        /// Keyword rule file (JSON); overrides the configured path
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Submit positively-labeled ads for LLM review
    Review {
        /// Original ads (JSONL); supplies the text to review
        #[arg(long)]
        ads: PathBuf,

        /// Enrichment output (JSONL); selects which ads to review
        #[arg(long)]
        labels: PathBuf,

        /// Output verdicts (JSONL)
        #[arg(long)]
        output: PathBuf,

        /// Model name; overrides the configured model
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?;
    init_logging(&config.log_level, &config.log_format);

    match cli.command {
        Commands::Enrich {
            input,
            output,
            crosswalks,
            rules,
            start_year,
            end_year,
            source,
        } => run_enrich(
            &config, &input, &output, crosswalks, rules, start_year, end_year, source,
        ),
        Commands::Validate { cases, rules } => run_validate(&config, cases, rules),
        Commands::Review {
            ads,
            labels,
            output,
            model,
        } => run_review(&config, &ads, &labels, &output, model).await,
    }
}

fn load_engine(config: &Config, rules_override: Option<PathBuf>) -> Result<KeywordEngine> {
    let rules = match rules_override.or_else(|| config.paths.rules.clone()) {
        Some(path) => RuleSet::from_file(&path)
            .with_context(|| format!("loading rules from {}", path.display()))?,
        None => RuleSet::builtin(),
    };
    let engine = KeywordEngine::new(rules)?;
    info!(
        terms = engine.term_count(),
        exclusions = engine.exclusion_count(),
        "Keyword engine compiled"
    );
    Ok(engine)
}

/// Human-readable context for an unmapped occupation code: the ISCO
/// sub-major group label when one exists, else the major group label.
fn occupation_group_label<'a>(store: &'a CrosswalkStore, code: &str) -> Option<&'a str> {
    if code.len() < 2 || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    store
        .isco_submajor_label(&code[..2])
        .or_else(|| store.isco_major_label(&code[..1]))
}

#[allow(clippy::too_many_arguments)]
fn run_enrich(
    config: &Config,
    input: &Path,
    output: &Path,
    crosswalks: Option<PathBuf>,
    rules: Option<PathBuf>,
    start_year: Option<i32>,
    end_year: Option<i32>,
    source: Option<String>,
) -> Result<()> {
    let crosswalk_dir = crosswalks.unwrap_or_else(|| config.paths.crosswalk_dir.clone());
    let sources = CrosswalkSources::from_dir(&crosswalk_dir);
    let store = CrosswalkStore::load(&sources)
        .with_context(|| format!("loading crosswalks from {}", crosswalk_dir.display()))?;
    let engine = load_engine(config, rules)?;

    let (records, _skipped) = io::read_records(input)?;
    let filter = RecordFilter {
        start_year,
        end_year,
        source,
    };
    let selected: Vec<AdRecord> = records.into_iter().filter(|r| filter.matches(r)).collect();
    info!(selected = selected.len(), "Applying record filter");

    let (rows, stats) = enrich_records_with_stats(&store, &engine, &selected);
    io::write_rows(output, &rows)?;

    println!("{}", stats.summary());
    if !stats.occupation_gaps.is_empty() {
        info!(
            distinct_codes = stats.occupation_gaps.len(),
            "Unmapped occupation codes: {:?}", stats.occupation_gaps
        );
        for (code, count) in &stats.occupation_gaps {
            if let Some(label) = occupation_group_label(&store, code) {
                info!(code = %code, count = *count, group = label, "Unmapped occupation group");
            }
        }
    }
    if !stats.industry_gaps.is_empty() {
        info!(
            distinct_codes = stats.industry_gaps.len(),
            "Unmapped industry codes: {:?}", stats.industry_gaps
        );
    }
    Ok(())
}

fn run_validate(
    config: &Config,
    cases: Option<PathBuf>,
    rules: Option<PathBuf>,
) -> Result<()> {
    let engine = load_engine(config, rules)?;
    let corpus_path = cases.unwrap_or_else(|| config.paths.corpus.clone());
    let corpus = load_corpus(&corpus_path)?;

    let report = evaluate(&engine, &corpus);
    println!("{}", report.summary());
    for mismatch in &report.mismatched_cases {
        warn!(
            expected = %mismatch.expected,
            actual = %mismatch.actual,
            found = ?mismatch.found_terms,
            missing = ?mismatch.missing_terms,
            "Mismatch: {}",
            mismatch.text
        );
    }
    // mismatches are findings, not failures; only load errors exit non-zero
    if report.is_clean() {
        info!(cases = corpus.len(), "Corpus is clean");
    }
    Ok(())
}

async fn run_review(
    config: &Config,
    ads: &Path,
    labels: &Path,
    output: &Path,
    model: Option<String>,
) -> Result<()> {
    let mut llm = config.llm.clone();
    if let Some(model) = model {
        llm.model = model;
    }
    let client = ReviewClient::new(llm)?;

    let (records, _skipped) = io::read_records(ads)?;
    let texts: BTreeMap<&str, &str> = records
        .iter()
        .filter_map(|r| Some((r.ad_id.as_str(), r.text.as_deref()?)))
        .collect();

    let rows: Vec<EnrichmentRow> = io::read_rows(labels)?;
    let items: Vec<ReviewItem> = rows
        .iter()
        .filter(|row| row.ai_requirement.is_positive())
        .filter_map(|row| {
            let text = texts.get(row.ad_id.as_str()).copied();
            if text.is_none() {
                warn!(ad_id = %row.ad_id, "No text for labeled ad, skipping review");
            }
            Some(ReviewItem {
                ad_id: row.ad_id.clone(),
                text: text?.to_string(),
            })
        })
        .collect();
    info!(
        labeled = rows.len(),
        selected = items.len(),
        "Selected positively-labeled ads for review"
    );

    let verdicts = client.review_all(&items).await;
    io::write_rows(output, &verdicts)?;
    Ok(())
}
