//! Clause text normalizer — converts raw wording to a canonical token set
//!
//! Library entries and user input go through the same pipeline, so matching
//! can work on plain set intersections.
//!
//! # Pipeline
//!
//! `text → segments → clean (NFKD, lowercase, punctuation → space) → fold plurals
//!  → drop ignore-list phrases → drop numbers, short words, ignore-list words → set`
//!
//! # Guarantees
//!
//! - **Idempotent**: normalizing the canonical rendering of a token set
//!   (`TokenSet`'s `Display`) returns the same set
//! - **Deterministic**: same text and configuration always produce the same set
//! - **Total**: never fails; empty or punctuation-only text yields an empty set
//!
//! # Plural folding
//!
//! [`fold_plural`] is a suffix-stripping heuristic, not a morphological
//! analyzer. It keeps every stem at least [`MIN_STEM_LENGTH`] characters long
//! and will mis-fold some irregular plurals (`series` → `sery`).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use crate::config::EngineConfig;

/// Words at or below this length are never folded, and folding never
/// produces a stem shorter than this.
pub const MIN_STEM_LENGTH: usize = 3;

/// Tokens shorter than this are dropped.
pub const DEFAULT_MIN_TOKEN_LENGTH: usize = 3;

/// Timing/notice language and generic fillers that never distinguish one
/// clause from another.
pub const BUILTIN_BOILERPLATE: &[&str] = &[
    "and", "or", "of", "the", "clause", "limit", "value", "in", "property", "policy",
    "insured", "insurance", "company", "be", "is", "are", "to", "for", "on", "by", "with",
    "at", "an", "a", "as", "it", "this", "that", "shall", "may", "each",
    // timing/notice
    "day", "days", "hour", "hours", "notice", "within", "period", "time", "any", "event",
    "request", "portion", "been", "force", "subject", "also", "terms", "agreement",
    "applicable", "provided", "always", "no", "refund", "allowed", "upon",
    // fillers
    "per", "up", "such", "but", "not", "from", "last", "known", "address", "letter",
    "registered", "adjusted", "pro", "rata", "short", "long", "term", "if", "has", "under",
    "cost", "costs", "loss",
];

/// Characters that end a phrase segment. Ignore-list phrases never match
/// across them.
const SEGMENT_BREAKS: &[char] = &[',', ';', ':', '.', '!', '?', '\n', '\r'];

// ── Tokens ─────────────────────────────────────────────────

/// A single word after cleaning, folding and filtering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedToken(String);

impl NormalizedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for NormalizedToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A true set of tokens, iterated in sorted order.
///
/// `Display` renders the canonical text form: sorted tokens joined by `", "`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSet(BTreeSet<NormalizedToken>);

impl TokenSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NormalizedToken> {
        self.0.iter()
    }

    /// Tokens present in both sets.
    pub fn intersection(&self, other: &TokenSet) -> TokenSet {
        TokenSet(self.0.intersection(&other.0).cloned().collect())
    }

    /// Tokens present in either set.
    pub fn union(&self, other: &TokenSet) -> TokenSet {
        TokenSet(self.0.union(&other.0).cloned().collect())
    }

    /// Plain string views, in sorted order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|t| t.0.clone()).collect()
    }

    fn insert(&mut self, token: String) {
        self.0.insert(NormalizedToken(token));
    }
}

impl FromIterator<NormalizedToken> for TokenSet {
    fn from_iter<I: IntoIterator<Item = NormalizedToken>>(iter: I) -> Self {
        TokenSet(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TokenSet {
    type Item = &'a NormalizedToken;
    type IntoIter = std::collections::btree_set::Iter<'a, NormalizedToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(token.as_str())?;
        }
        Ok(())
    }
}

// ── Ignore list ────────────────────────────────────────────

/// Words and phrases removed before matching.
///
/// Entries are stored in folded form, so `"Days"`, `"days"` and `"day"` are
/// the same entry. Entries of more than one word are phrases and are removed
/// as a unit only when they appear contiguously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    words: BTreeSet<String>,
    phrases: BTreeSet<Vec<String>>,
}

impl IgnoreList {
    /// An ignore-list with no entries at all (not even boilerplate).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from user entries only.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::empty();
        list.extend(entries);
        list
    }

    /// Build from user entries plus [`BUILTIN_BOILERPLATE`].
    pub fn with_builtin_boilerplate<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new(BUILTIN_BOILERPLATE);
        list.extend(entries);
        list
    }

    /// Add entries; blank or punctuation-only entries are skipped.
    pub fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            let words = folded_words(entry.as_ref());
            match words.len() {
                0 => {}
                1 => {
                    self.words.extend(words);
                }
                _ => {
                    self.phrases.insert(words);
                }
            }
        }
    }

    /// Whether a folded word is a single-word entry.
    pub fn contains_word(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn phrase_count(&self) -> usize {
        self.phrases.len()
    }

    /// Phrases ordered longest first so overlapping entries resolve the same
    /// way on every run.
    fn phrases_longest_first(&self) -> Vec<&Vec<String>> {
        let mut phrases: Vec<&Vec<String>> = self.phrases.iter().collect();
        phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        phrases
    }

    fn feed_digest(&self, hasher: &mut Sha256) {
        for word in &self.words {
            hasher.update(b"w:");
            hasher.update(word.as_bytes());
            hasher.update(b"\n");
        }
        for phrase in &self.phrases {
            hasher.update(b"p:");
            hasher.update(phrase.join(" ").as_bytes());
            hasher.update(b"\n");
        }
    }
}

// ── Normalizer ─────────────────────────────────────────────

/// A configured normalizer.
///
/// Holds the ignore-list and filtering knobs together with a fingerprint of
/// that configuration; caches of normalized text are tagged with the
/// fingerprint so a configuration change never reuses stale tokens.
#[derive(Debug, Clone)]
pub struct Normalizer {
    ignore: IgnoreList,
    min_token_length: usize,
    drop_numeric: bool,
    fingerprint: String,
}

impl Normalizer {
    /// Normalizer with default filtering and the given ignore-list.
    pub fn new(ignore: IgnoreList) -> Self {
        Self::with_options(ignore, DEFAULT_MIN_TOKEN_LENGTH, true)
    }

    pub fn with_options(ignore: IgnoreList, min_token_length: usize, drop_numeric: bool) -> Self {
        let fingerprint = compute_fingerprint(&ignore, min_token_length, drop_numeric);
        Self {
            ignore,
            min_token_length,
            drop_numeric,
            fingerprint,
        }
    }

    /// Build from an engine configuration: user ignore-list plus the
    /// configured (or built-in) boilerplate.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut ignore = match &config.boilerplate {
            Some(words) => IgnoreList::new(words),
            None => IgnoreList::new(BUILTIN_BOILERPLATE),
        };
        ignore.extend(&config.ignore_list);
        Self::with_options(ignore, config.min_token_length, config.drop_numeric)
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Hex SHA-256 of the configuration.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Normalize raw text into a token set.
    pub fn normalize(&self, text: &str) -> TokenSet {
        let phrases = self.ignore.phrases_longest_first();
        let mut tokens = TokenSet::new();

        for words in segment_words(text) {
            let mut i = 0;
            while i < words.len() {
                if let Some(len) = phrase_at(&words[i..], &phrases) {
                    i += len;
                    continue;
                }
                let word = &words[i];
                i += 1;
                if self.keeps(word) {
                    tokens.insert(word.clone());
                }
            }
        }

        tracing::trace!(input_len = text.len(), tokens = tokens.len(), "normalized text");
        tokens
    }

    /// Re-normalize an existing token set. A no-op for sets produced by the
    /// same normalizer.
    pub fn normalize_tokens(&self, tokens: &TokenSet) -> TokenSet {
        self.normalize(&tokens.to_string())
    }

    fn keeps(&self, word: &str) -> bool {
        if word.chars().count() < self.min_token_length {
            return false;
        }
        if self.drop_numeric && word.chars().all(char::is_numeric) {
            return false;
        }
        !self.ignore.contains_word(word)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Normalize `text` against `ignore` with default filtering.
///
/// Convenience wrapper for one-off calls; hot paths should build a
/// [`Normalizer`] once and reuse it.
pub fn normalize(text: &str, ignore: &IgnoreList) -> TokenSet {
    Normalizer::new(ignore.clone()).normalize(text)
}

// ── Text helpers ───────────────────────────────────────────

/// Lowercase, compatibility-decompose and replace every character that is
/// not alphanumeric or whitespace with a space.
pub fn clean_text(text: &str) -> String {
    let lowered: String = text.nfkd().collect::<String>().to_lowercase();
    lowered
        .nfkd()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect()
}

/// Fold a lowercase word to its singular form.
///
/// Rules, first match wins:
/// 1. words of [`MIN_STEM_LENGTH`] characters or fewer are kept
/// 2. `-ies` → `-y` (`policies` → `policy`)
/// 3. `-sses`, `-xes`, `-zes`, `-ches`, `-shes` drop `es` (`classes` → `class`)
/// 4. words ending in `ss`, `us`, `is` are kept (`loss`, `status`, `basis`)
/// 5. a trailing `s` is dropped (`clauses` → `clause`)
///
/// Rules 2, 3 and 5 only apply when the stem keeps at least
/// [`MIN_STEM_LENGTH`] characters. Folding a folded word is a no-op.
pub fn fold_plural(word: &str) -> String {
    if word.chars().count() <= MIN_STEM_LENGTH {
        return word.to_string();
    }
    let long_enough = |stem: &str| stem.chars().count() >= MIN_STEM_LENGTH;

    if let Some(stem) = word.strip_suffix("ies") {
        if long_enough(stem) {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "xes", "zes", "ches", "shes"] {
        if word.ends_with(suffix) {
            let stem = &word[..word.len() - 2];
            if long_enough(stem) {
                return stem.to_string();
            }
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('s') {
        if long_enough(stem) {
            return stem.to_string();
        }
    }
    word.to_string()
}

/// Cleaned, plural-folded words of `text`, in order, unfiltered.
pub fn folded_words(text: &str) -> Vec<String> {
    clean_text(text).split_whitespace().map(fold_plural).collect()
}

/// Split text into phrase segments of cleaned, folded words.
pub(crate) fn segment_words(text: &str) -> Vec<Vec<String>> {
    text.split(SEGMENT_BREAKS)
        .map(folded_words)
        .filter(|words| !words.is_empty())
        .collect()
}

/// Length of the first phrase that starts at `words[0]`, if any.
fn phrase_at(words: &[String], phrases: &[&Vec<String>]) -> Option<usize> {
    phrases
        .iter()
        .find(|phrase| words.len() >= phrase.len() && words[..phrase.len()] == phrase[..])
        .map(|phrase| phrase.len())
}

fn compute_fingerprint(ignore: &IgnoreList, min_token_length: usize, drop_numeric: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("min={};numeric={}\n", min_token_length, drop_numeric).as_bytes());
    ignore.feed_digest(&mut hasher);
    hex::encode(hasher.finalize())
}
