//! Clause library — the read-only reference clauses for one
//! (department, reinsurer) pair
//!
//! Entries are immutable once the library is built. Normalized token sets are
//! memoized in a side-table ([`TokenCache`]) owned by the library, keyed by
//! clause id and tagged with the normalizer fingerprint that produced them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalizer::{Normalizer, TokenSet};
use crate::{Error, Result};

// ── Clause entries ─────────────────────────────────────────

/// Identity of a clause within its library.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClauseId(String);

impl ClauseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClauseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ClauseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<usize> for ClauseId {
    fn from(id: usize) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ClauseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference clause as supplied by the library loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseEntry {
    pub id: ClauseId,
    pub title: String,
    #[serde(alias = "bodyText")]
    pub body_text: String,
    #[serde(default)]
    pub reinsurer: String,
    #[serde(default)]
    pub department: String,
    /// Extra matching vocabulary; contributes tokens like the body text.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Limit wording shown next to the title.
    #[serde(default)]
    pub limit: Option<String>,
}

impl ClauseEntry {
    pub fn new(
        id: impl Into<ClauseId>,
        title: impl Into<String>,
        body_text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body_text: body_text.into(),
            reinsurer: String::new(),
            department: String::new(),
            keywords: Vec::new(),
            limit: None,
        }
    }

    pub fn with_context(mut self, department: impl Into<String>, reinsurer: impl Into<String>) -> Self {
        self.department = department.into();
        self.reinsurer = reinsurer.into();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    /// Non-blank limit wording, trimmed.
    pub fn limit_text(&self) -> Option<&str> {
        self.limit.as_deref().map(str::trim).filter(|l| !l.is_empty())
    }

    /// How the clause is shown to the user: `title` or `title – limit`.
    pub fn display_text(&self) -> String {
        let title = self.title.trim();
        match self.limit_text() {
            Some(limit) => format!("{} – {}", title, limit),
            None => title.to_string(),
        }
    }

    /// Normalized tokens of the body text and keywords.
    pub fn normalized_tokens(&self, normalizer: &Normalizer) -> TokenSet {
        self.keywords
            .iter()
            .fold(normalizer.normalize(&self.body_text), |acc, kw| {
                acc.union(&normalizer.normalize(kw))
            })
    }
}

// ── Token cache ────────────────────────────────────────────

#[derive(Debug, Clone)]
struct CachedTokens {
    fingerprint: String,
    tokens: Arc<TokenSet>,
}

/// Per-entry memo of normalized token sets.
///
/// Two callers racing on the same empty slot may both compute; the values are
/// identical so whichever write lands last is correct. A lookup with a
/// different normalizer fingerprint recomputes and replaces the slot.
#[derive(Debug, Default)]
pub struct TokenCache {
    slots: RwLock<HashMap<ClauseId, CachedTokens>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tokens for `id` under `fingerprint`, computing them on a miss.
    pub fn get_or_insert_with<F>(&self, id: &ClauseId, fingerprint: &str, compute: F) -> Arc<TokenSet>
    where
        F: FnOnce() -> TokenSet,
    {
        if let Some(hit) = self.lookup(id, fingerprint) {
            return hit;
        }

        let tokens = Arc::new(compute());
        tracing::trace!(clause = %id, tokens = tokens.len(), "cached clause tokens");
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.insert(
            id.clone(),
            CachedTokens {
                fingerprint: fingerprint.to_string(),
                tokens: Arc::clone(&tokens),
            },
        );
        tokens
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn lookup(&self, id: &ClauseId, fingerprint: &str) -> Option<Arc<TokenSet>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(id)
            .filter(|cached| cached.fingerprint == fingerprint)
            .map(|cached| Arc::clone(&cached.tokens))
    }
}

// ── Library ────────────────────────────────────────────────

/// Ordered, read-only clause collection for one department and reinsurer.
#[derive(Debug)]
pub struct ClauseLibrary {
    department: String,
    reinsurer: String,
    entries: Vec<ClauseEntry>,
    index: HashMap<ClauseId, usize>,
    digest: String,
    cache: TokenCache,
}

impl ClauseLibrary {
    /// Build a library, preserving entry order.
    ///
    /// # Errors
    /// Returns `DuplicateClauseId` if two entries share an id.
    pub fn new(
        department: impl Into<String>,
        reinsurer: impl Into<String>,
        entries: Vec<ClauseEntry>,
    ) -> Result<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if index.insert(entry.id.clone(), position).is_some() {
                return Err(Error::DuplicateClauseId(entry.id.to_string()));
            }
        }
        let department = department.into();
        let reinsurer = reinsurer.into();
        let digest = compute_digest(&department, &reinsurer, &entries);
        let library = Self {
            department,
            reinsurer,
            entries,
            index,
            digest,
            cache: TokenCache::new(),
        };
        tracing::debug!(
            department = %library.department,
            reinsurer = %library.reinsurer,
            clauses = library.entries.len(),
            "clause library loaded"
        );
        Ok(library)
    }

    /// A library with no clauses; every match against it is empty.
    pub fn empty(department: impl Into<String>, reinsurer: impl Into<String>) -> Self {
        let department = department.into();
        let reinsurer = reinsurer.into();
        let digest = compute_digest(&department, &reinsurer, &[]);
        Self {
            department,
            reinsurer,
            entries: Vec::new(),
            index: HashMap::new(),
            digest,
            cache: TokenCache::new(),
        }
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn reinsurer(&self) -> &str {
        &self.reinsurer
    }

    pub fn entries(&self) -> &[ClauseEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &ClauseId) -> Option<&ClauseEntry> {
        self.position(id).map(|i| &self.entries[i])
    }

    /// Load-order position of a clause.
    pub fn position(&self, id: &ClauseId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Normalized tokens of the entry at `position`, memoized per normalizer
    /// fingerprint.
    pub fn tokens_at(&self, position: usize, normalizer: &Normalizer) -> Option<Arc<TokenSet>> {
        let entry = self.entries.get(position)?;
        Some(
            self.cache
                .get_or_insert_with(&entry.id, normalizer.fingerprint(), || {
                    entry.normalized_tokens(normalizer)
                }),
        )
    }

    /// Normalized tokens of a clause by id.
    pub fn tokens_for(&self, id: &ClauseId, normalizer: &Normalizer) -> Option<Arc<TokenSet>> {
        self.position(id)
            .and_then(|position| self.tokens_at(position, normalizer))
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Hex SHA-256 over the context and every entry, in load order.
    ///
    /// Computed once at construction; entries never change afterwards.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

fn compute_digest(department: &str, reinsurer: &str, entries: &[ClauseEntry]) -> String {
    let mut hasher = Sha256::new();
    feed_field(&mut hasher, department);
    feed_field(&mut hasher, reinsurer);
    for entry in entries {
        feed_field(&mut hasher, entry.id.as_str());
        feed_field(&mut hasher, &entry.title);
        feed_field(&mut hasher, &entry.body_text);
        feed_field(&mut hasher, &entry.department);
        feed_field(&mut hasher, &entry.reinsurer);
        hasher.update((entry.keywords.len() as u64).to_le_bytes());
        for keyword in &entry.keywords {
            feed_field(&mut hasher, keyword);
        }
        feed_field(&mut hasher, entry.limit.as_deref().unwrap_or(""));
    }
    hex::encode(hasher.finalize())
}

/// Length-prefixed so adjacent fields cannot collide.
fn feed_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
