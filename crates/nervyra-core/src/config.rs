//! Engine configuration
//!
//! Everything tunable lives in one [`EngineConfig`] owned by the caller and
//! passed explicitly into the normalizer and matcher. There is no global
//! state, so re-reading the configuration between calls is always safe.
//!
//! ## Example JSON
//!
//! ```json
//! {
//!   "ignore_list": ["LM7", "Temporary", "Payment Warranty"],
//!   "min_token_length": 3,
//!   "drop_numeric": true,
//!   "thresholds": { "full": 0.75, "partial": 0.25 },
//!   "protected_phrases": [],
//!   "title_keyed_departments": ["Liability"]
//! }
//! ```
//!
//! Every field is optional. `boilerplate` replaces the built-in boilerplate
//! list when present.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::matcher::MatchThresholds;
use crate::normalizer::DEFAULT_MIN_TOKEN_LENGTH;
use crate::{Error, Result};

/// Ignore-list entries applied when no configuration says otherwise.
pub const DEFAULT_IGNORE_LIST: &[&str] = &["LM7", "Temporary", "Payment Warranty"];

/// Departments whose clause uniqueness is keyed by title alone.
pub const DEFAULT_TITLE_KEYED_DEPARTMENTS: &[&str] = &["Liability"];

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// User ignore-list: single words or multi-word phrases.
    pub ignore_list: Vec<String>,
    /// Replacement for the built-in boilerplate list; `None` keeps the built-in.
    pub boilerplate: Option<Vec<String>>,
    /// Tokens shorter than this are dropped.
    pub min_token_length: usize,
    /// Drop purely numeric tokens.
    pub drop_numeric: bool,
    /// Classification thresholds.
    pub thresholds: MatchThresholds,
    /// Lines containing any of these are kept verbatim and never matched.
    pub protected_phrases: Vec<String>,
    /// Departments where line review dedupes clauses by title only.
    pub title_keyed_departments: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ignore_list: DEFAULT_IGNORE_LIST.iter().map(|s| s.to_string()).collect(),
            boilerplate: None,
            min_token_length: DEFAULT_MIN_TOKEN_LENGTH,
            drop_numeric: true,
            thresholds: MatchThresholds::default(),
            protected_phrases: Vec::new(),
            title_keyed_departments: DEFAULT_TITLE_KEYED_DEPARTMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            ignore_entries = config.ignore_list.len(),
            "loaded engine configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if self.min_token_length == 0 {
            return Err(Error::InvalidConfig(
                "min_token_length must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Add ignore-list entries on top of the configured ones.
    pub fn with_extra_ignores<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_list.extend(extra.into_iter().map(Into::into));
        self
    }

    /// Whether line review dedupes clauses of `department` by title only.
    pub fn is_title_keyed(&self, department: &str) -> bool {
        department_listed(&self.title_keyed_departments, department)
    }
}

/// Case-insensitive, whitespace-tolerant department membership.
pub(crate) fn department_listed(departments: &[String], department: &str) -> bool {
    departments
        .iter()
        .any(|d| d.trim().eq_ignore_ascii_case(department.trim()))
}
