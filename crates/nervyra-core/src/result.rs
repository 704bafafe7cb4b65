//! Result set — matcher output plus the context the presentation layer needs
//!
//! A read model: it carries the query, the ranked results and the
//! department/reinsurer/library identity they were produced against. Status
//! counts are derived on demand so they stay correct after workflow actions.

use serde::{Deserialize, Serialize};

use crate::library::{ClauseId, ClauseLibrary};
use crate::matcher::MatchResult;
use crate::normalizer::TokenSet;
use crate::status::{MatchAction, MatchStatus};
use crate::{Error, Result};

/// Number of results in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub matched: usize,
    pub partial_match: usize,
    pub rejected: usize,
    pub overridden: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.matched + self.partial_match + self.rejected + self.overridden
    }

    pub fn get(&self, status: MatchStatus) -> usize {
        match status {
            MatchStatus::Matched => self.matched,
            MatchStatus::PartialMatch => self.partial_match,
            MatchStatus::Rejected => self.rejected,
            MatchStatus::Overridden => self.overridden,
        }
    }

    fn record(&mut self, status: MatchStatus) {
        match status {
            MatchStatus::Matched => self.matched += 1,
            MatchStatus::PartialMatch => self.partial_match += 1,
            MatchStatus::Rejected => self.rejected += 1,
            MatchStatus::Overridden => self.overridden += 1,
        }
    }
}

/// Ranked matches for one query against one library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub department: String,
    pub reinsurer: String,
    /// Digest of the library the results refer to.
    pub library_digest: String,
    pub query_tokens: TokenSet,
    /// Number of clauses the query was compared against.
    pub total_candidates: usize,
    pub results: Vec<MatchResult>,
}

impl ResultSet {
    /// Wrap matcher output with its library context.
    pub fn assemble(library: &ClauseLibrary, query_tokens: TokenSet, results: Vec<MatchResult>) -> Self {
        Self {
            department: library.department().to_string(),
            reinsurer: library.reinsurer().to_string(),
            library_digest: library.digest().to_string(),
            query_tokens,
            total_candidates: library.len(),
            results,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for result in &self.results {
            counts.record(result.status);
        }
        counts
    }

    /// Highest-ranked result.
    pub fn best(&self) -> Option<&MatchResult> {
        self.results.first()
    }

    pub fn get(&self, id: &ClauseId) -> Option<&MatchResult> {
        self.results.iter().find(|r| &r.clause_id == id)
    }

    pub fn get_mut(&mut self, id: &ClauseId) -> Option<&mut MatchResult> {
        self.results.iter_mut().find(|r| &r.clause_id == id)
    }

    /// Route a workflow action to the result for `id`.
    ///
    /// # Errors
    /// `UnknownClause` if no result has that id, `InvalidTransition` if the
    /// action is illegal from its status.
    pub fn apply(&mut self, id: &ClauseId, action: MatchAction) -> Result<MatchStatus> {
        self.result_mut(id)?.apply(action)
    }

    /// Override the result for `id` with user wording.
    pub fn override_clause(&mut self, id: &ClauseId, text: impl Into<String>) -> Result<MatchStatus> {
        self.result_mut(id)?.override_with(text)
    }

    /// Results that belong in the exported clause set (`Matched` or
    /// `Overridden`), in rank order.
    pub fn accepted(&self) -> impl Iterator<Item = &MatchResult> {
        self.results.iter().filter(|r| r.status.is_accepted())
    }

    /// Whether `library` is the same content these results were built from.
    pub fn is_current_for(&self, library: &ClauseLibrary) -> bool {
        self.library_digest == library.digest()
    }

    fn result_mut(&mut self, id: &ClauseId) -> Result<&mut MatchResult> {
        self.get_mut(id)
            .ok_or_else(|| Error::UnknownClause(id.to_string()))
    }
}
