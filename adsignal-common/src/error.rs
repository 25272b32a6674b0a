//! Error types for the adsignal pipeline.
//!
//! Only load-time failures (reference tables, rule files, corpus) are
//! errors. Per-record problems (unmapped codes, absent text) are data and
//! surface as missing values in the output, never through this type.

use thiserror::Error;

/// Result type alias using the adsignal error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the adsignal crates.
#[derive(Error, Debug)]
pub enum Error {
    /// Crosswalk reference table missing or malformed
    #[error("Crosswalk error: {0}")]
    Crosswalk(String),

    /// Keyword rule set missing or malformed
    #[error("Rule set error: {0}")]
    Rules(String),

    /// Labeled test corpus missing or malformed
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External validation service error
    #[error("Validation service error: {0}")]
    External(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check whether this error is fatal at load time. Context wrappers are
    /// transparent: what matters is the underlying failure.
    pub fn is_load_failure(&self) -> bool {
        match self {
            Self::Crosswalk(_) | Self::Rules(_) | Self::Corpus(_) | Self::Config(_) => true,
            Self::WithContext { source, .. } => source.is_load_failure(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_failure_taxonomy() {
        assert!(Error::Crosswalk("bad weight".into()).is_load_failure());
        assert!(Error::Corpus("missing".into()).is_load_failure());
        assert!(!Error::External("timeout".into()).is_load_failure());
    }

    #[test]
    fn test_context_preserves_load_failure_taxonomy() {
        let wrapped = Error::Crosswalk("bad weight".into()).with_context("loading tables");
        assert!(wrapped.is_load_failure());

        let wrapped = Error::External("timeout".into()).with_context("review call");
        assert!(!wrapped.is_load_failure());
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::Crosswalk("duplicate key 25".into());
        let with_ctx = err.with_context("loading industry table");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert!(with_ctx
            .to_string()
            .starts_with("loading industry table"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = res.context("reading corpus").unwrap_err();
        assert!(err.to_string().contains("reading corpus"));
    }
}
