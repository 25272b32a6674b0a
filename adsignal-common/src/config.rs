//! Configuration for the adsignal pipeline.
//!
//! Configuration is a single JSON file, optional in full: every field has a
//! default, so the binaries run without one.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (`ADSIGNAL_*`, `OPENAI_API_KEY`)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ADSIGNAL_API_BASE`  → llm.api_base
//! - `ADSIGNAL_MODEL`     → llm.model
//! - `OPENAI_API_KEY`     → llm.api_key
//! - `ADSIGNAL_LOG_LEVEL` → log_level

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format ("pretty" or "json")
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Reference file locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Secondary-validation service settings
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            paths: PathsConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Locations of the reference files the pipeline loads at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the crosswalk CSV tables
    #[serde(default = "default_crosswalk_dir")]
    pub crosswalk_dir: PathBuf,

    /// Keyword rule file (JSON); None uses the built-in rule set
    #[serde(default)]
    pub rules: Option<PathBuf>,

    /// Labeled test corpus for the validation harness
    #[serde(default = "default_corpus")]
    pub corpus: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            crosswalk_dir: default_crosswalk_dir(),
            rules: None,
            corpus: default_corpus(),
        }
    }
}

fn default_crosswalk_dir() -> PathBuf {
    PathBuf::from("reference/crosswalks")
}

fn default_corpus() -> PathBuf {
    PathBuf::from("reference/cases.json")
}

/// Settings for the OpenAI-compatible secondary-validation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// API key; usually injected via OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Records per mini-batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts per request before marking records unvalidated
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff between retries in milliseconds (doubled per attempt)
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_batch_size() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Config {
    /// Load configuration from a JSON file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid config {}: {e}", path.display())))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a file when one is given, otherwise defaults + environment.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Apply `ADSIGNAL_*` / `OPENAI_API_KEY` environment overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ADSIGNAL_API_BASE") {
            if !v.is_empty() {
                self.llm.api_base = v;
            }
        }
        if let Ok(v) = std::env::var("ADSIGNAL_MODEL") {
            if !v.is_empty() {
                self.llm.model = v;
            }
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            if !v.is_empty() {
                self.llm.api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("ADSIGNAL_LOG_LEVEL") {
            if !v.is_empty() {
                self.log_level = v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.llm.backoff_ms, 1000);
        assert!(config.paths.rules.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{
                "log_level": "debug",
                "llm": {{ "model": "gpt-4o", "batch_size": 5, "backoff_ms": 2000 }}
            }}"#
        )
        .unwrap();
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.batch_size, 5);
        assert_eq!(config.llm.backoff_ms, 2000);
        // untouched fields keep defaults
        assert_eq!(config.llm.timeout_secs, 60);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/nonexistent/adsignal.json")).unwrap_err();
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        let err = Config::load(f.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
