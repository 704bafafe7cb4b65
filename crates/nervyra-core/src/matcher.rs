//! Matcher — scores a normalized query against every clause in a library
//!
//! # Scoring
//!
//! `score = |query ∩ clause| / |clause|`, the fraction of the reference
//! clause's tokens found in the user's text. Verbose input is not penalized;
//! short, specific clauses are easier to satisfy.
//!
//! # Classification
//!
//! - `score >= thresholds.full` → `Matched`
//! - `thresholds.partial <= score < thresholds.full` → `PartialMatch`
//! - anything lower is dropped from the result
//!
//! # Ordering
//!
//! Descending score, then library load order. Identical inputs always give an
//! identical sequence.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::library::{ClauseId, ClauseLibrary};
use crate::normalizer::{Normalizer, TokenSet};
use crate::result::ResultSet;
use crate::status::{MatchAction, MatchStatus};
use crate::{Error, Result};

/// Default score at or above which a clause is `Matched`.
pub const FULL_MATCH_THRESHOLD: f64 = 0.75;

/// Default score at or above which a clause is at least `PartialMatch`.
pub const PARTIAL_THRESHOLD: f64 = 0.25;

// ── Thresholds ─────────────────────────────────────────────

/// Classification thresholds. Valid when `0 < partial <= full <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchThresholds {
    pub full: f64,
    pub partial: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            full: FULL_MATCH_THRESHOLD,
            partial: PARTIAL_THRESHOLD,
        }
    }
}

impl MatchThresholds {
    /// Build and validate.
    pub fn new(full: f64, partial: f64) -> Result<Self> {
        let thresholds = Self { full, partial };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = self.partial > 0.0 && self.partial <= self.full && self.full <= 1.0;
        if !in_range {
            return Err(Error::InvalidConfig(format!(
                "thresholds must satisfy 0 < partial <= full <= 1 (got partial={}, full={})",
                self.partial, self.full
            )));
        }
        Ok(())
    }

    /// Initial status for `score`, or `None` when it is below `partial`.
    pub fn classify(&self, score: f64) -> Option<MatchStatus> {
        if score >= self.full {
            Some(MatchStatus::Matched)
        } else if score >= self.partial {
            Some(MatchStatus::PartialMatch)
        } else {
            None
        }
    }
}

// ── Match result ───────────────────────────────────────────

/// One clause that survived classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub clause_id: ClauseId,
    /// Load-order position of the clause in its library.
    pub position: usize,
    /// Overlap ratio, always in `(0, 1]`.
    pub score: f64,
    /// Query tokens found in the clause.
    pub matched_tokens: TokenSet,
    pub status: MatchStatus,
    /// User wording that replaced the clause, once `Overridden`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_text: Option<String>,
}

impl MatchResult {
    /// Apply a workflow action.
    ///
    /// # Errors
    /// `InvalidTransition` if the action is not legal from the current
    /// status; the result is left unchanged.
    pub fn apply(&mut self, action: MatchAction) -> Result<MatchStatus> {
        self.status = self.status.apply(action)?;
        Ok(self.status)
    }

    pub fn accept(&mut self) -> Result<MatchStatus> {
        self.apply(MatchAction::Accept)
    }

    pub fn reject(&mut self) -> Result<MatchStatus> {
        self.apply(MatchAction::Reject)
    }

    /// Replace the clause with user-edited wording.
    pub fn override_with(&mut self, text: impl Into<String>) -> Result<MatchStatus> {
        let status = self.apply(MatchAction::Override)?;
        self.override_text = Some(text.into());
        Ok(status)
    }
}

// ── Matching ───────────────────────────────────────────────

/// Overlap ratio of `query` against `clause`, with the shared tokens.
///
/// Returns `None` when the clause has no tokens or nothing overlaps.
pub fn overlap_score(query: &TokenSet, clause: &TokenSet) -> Option<(f64, TokenSet)> {
    if clause.is_empty() {
        return None;
    }
    let shared = query.intersection(clause);
    if shared.is_empty() {
        return None;
    }
    let score = shared.len() as f64 / clause.len() as f64;
    Some((score, shared))
}

/// Match a normalized query against every clause in `library`.
///
/// An empty query or an empty library yields an empty sequence.
pub fn match_tokens(
    query: &TokenSet,
    library: &ClauseLibrary,
    normalizer: &Normalizer,
    thresholds: &MatchThresholds,
) -> Vec<MatchResult> {
    if query.is_empty() || library.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<MatchResult> = library
        .entries()
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            let clause_tokens = library.tokens_at(position, normalizer)?;
            let (score, matched_tokens) = overlap_score(query, &clause_tokens)?;
            let status = thresholds.classify(score)?;
            Some(MatchResult {
                clause_id: entry.id.clone(),
                position,
                score,
                matched_tokens,
                status,
                override_text: None,
            })
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.position.cmp(&b.position))
    });

    tracing::debug!(
        query_tokens = query.len(),
        candidates = library.len(),
        results = results.len(),
        "matched query against library"
    );
    results
}

/// A normalizer and thresholds bundled for repeated matching.
#[derive(Debug, Clone)]
pub struct Matcher {
    normalizer: Normalizer,
    thresholds: MatchThresholds,
}

impl Matcher {
    pub fn new(normalizer: Normalizer, thresholds: MatchThresholds) -> Self {
        Self {
            normalizer,
            thresholds,
        }
    }

    /// Build from a configuration, validating it first.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(Normalizer::from_config(config), config.thresholds))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    /// Ranked matches for an already-normalized query.
    pub fn match_tokens(&self, query: &TokenSet, library: &ClauseLibrary) -> Vec<MatchResult> {
        match_tokens(query, library, &self.normalizer, &self.thresholds)
    }

    /// Normalize `text`, match it and wrap the outcome for presentation.
    pub fn match_text(&self, text: &str, library: &ClauseLibrary) -> ResultSet {
        let query = self.normalizer.normalize(text);
        let results = self.match_tokens(&query, library);
        ResultSet::assemble(library, query, results)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(Normalizer::default(), MatchThresholds::default())
    }
}
