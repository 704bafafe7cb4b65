//! Line review — matches a pasted block of clause wording line by line
//!
//! Each non-blank line is matched on its own. Lines carrying protected wording
//! are never matched and are kept verbatim by the workflow. A library clause
//! is assigned to at most one line: the line whose best score is highest,
//! with the earlier line winning ties.
//!
//! Uniqueness is keyed by `(title, limit)`, or by title alone for departments
//! configured as title-keyed (liability wordings carry no meaningful limit).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{department_listed, EngineConfig};
use crate::library::{ClauseEntry, ClauseLibrary};
use crate::matcher::{MatchResult, Matcher};
use crate::normalizer::{folded_words, TokenSet};
use crate::Result;

/// Characters stripped from both ends of every input line.
pub const BULLET_CHARS: &[char] = &['•', '–', '-', '*', ' ', '\t'];

/// Split pasted text into trimmed, non-blank lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_matches(BULLET_CHARS).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Protected wording ──────────────────────────────────────

/// Phrases that make a whole line unmatchable.
///
/// Matching ignores separators between words: `LM7`, `LM-7` and `LM 7` all
/// carry the protected phrase `LM7`. A phrase must still start and end on a
/// word boundary of the line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedPhrases {
    /// Folded words of each phrase, joined without separators.
    phrases: Vec<String>,
}

impl ProtectedPhrases {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .map(|p| folded_words(p.as_ref()).concat())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Whether some run of consecutive words in `line` spells a phrase.
    pub fn matches(&self, line: &str) -> bool {
        if self.phrases.is_empty() {
            return false;
        }
        let line_words = folded_words(line);
        self.phrases.iter().any(|phrase| {
            (0..line_words.len()).any(|start| spells(&line_words[start..], phrase))
        })
    }
}

/// Whether a prefix run of `words`, concatenated, equals `target` exactly.
fn spells(words: &[String], target: &str) -> bool {
    let mut rest = target;
    for word in words {
        match rest.strip_prefix(word.as_str()) {
            Some("") => return true,
            Some(tail) => rest = tail,
            None => return false,
        }
    }
    false
}

// ── Review output ──────────────────────────────────────────

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineOutcome {
    /// The line was assigned this clause.
    Matched { result: MatchResult },
    /// No clause, or its best clause went to a better line.
    Unmatched,
    /// The line carries protected wording and is kept as typed.
    Protected,
}

/// Review of a single input line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineMatch {
    /// Position among the non-blank input lines.
    pub index: usize,
    pub text: String,
    pub tokens: TokenSet,
    pub outcome: LineOutcome,
    /// Every ranked candidate for the line, for manual review.
    pub candidates: Vec<MatchResult>,
}

impl LineMatch {
    pub fn assigned(&self) -> Option<&MatchResult> {
        match &self.outcome {
            LineOutcome::Matched { result } => Some(result),
            _ => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.outcome, LineOutcome::Protected)
    }
}

/// Review of a whole block of input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineReview {
    pub department: String,
    pub reinsurer: String,
    pub library_digest: String,
    pub lines: Vec<LineMatch>,
}

impl LineReview {
    pub fn matched_count(&self) -> usize {
        self.lines.iter().filter(|l| l.assigned().is_some()).count()
    }

    pub fn protected_count(&self) -> usize {
        self.lines.iter().filter(|l| l.is_protected()).count()
    }

    pub fn unmatched_count(&self) -> usize {
        self.lines.len() - self.matched_count() - self.protected_count()
    }
}

// ── Reviewer ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniquenessKey {
    Title(String),
    TitleAndLimit(String, String),
}

impl UniquenessKey {
    fn for_entry(entry: &ClauseEntry, title_keyed: bool) -> Self {
        let title = entry.title.trim().to_string();
        if title_keyed {
            Self::Title(title)
        } else {
            Self::TitleAndLimit(title, entry.limit_text().unwrap_or("").to_string())
        }
    }
}

/// Line-by-line matcher with protected wording and clause uniqueness.
#[derive(Debug, Clone)]
pub struct LineReviewer {
    matcher: Matcher,
    protected: ProtectedPhrases,
    title_keyed_departments: Vec<String>,
}

impl LineReviewer {
    pub fn new(matcher: Matcher, protected: ProtectedPhrases, title_keyed_departments: Vec<String>) -> Self {
        Self {
            matcher,
            protected,
            title_keyed_departments,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(
            Matcher::from_config(config)?,
            ProtectedPhrases::new(&config.protected_phrases),
            config.title_keyed_departments.clone(),
        ))
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    fn is_title_keyed(&self, department: &str) -> bool {
        department_listed(&self.title_keyed_departments, department)
    }

    /// Review every line of `text` against `library`.
    pub fn review(&self, text: &str, library: &ClauseLibrary) -> LineReview {
        let title_keyed = self.is_title_keyed(library.department());

        let mut lines: Vec<LineMatch> = split_lines(text)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                if self.protected.matches(&text) {
                    return LineMatch {
                        index,
                        text,
                        tokens: TokenSet::new(),
                        outcome: LineOutcome::Protected,
                        candidates: Vec::new(),
                    };
                }
                let tokens = self.matcher.normalizer().normalize(&text);
                let candidates = self.matcher.match_tokens(&tokens, library);
                LineMatch {
                    index,
                    text,
                    tokens,
                    outcome: LineOutcome::Unmatched,
                    candidates,
                }
            })
            .collect();

        // Best line per clause key; an equal score keeps the earlier line.
        let mut winners: HashMap<UniquenessKey, (usize, f64)> = HashMap::new();
        for line in &lines {
            let Some(best) = line.candidates.first() else {
                continue;
            };
            let Some(entry) = library.get(&best.clause_id) else {
                continue;
            };
            let key = UniquenessKey::for_entry(entry, title_keyed);
            let keep_existing = winners
                .get(&key)
                .is_some_and(|&(_, score)| score >= best.score);
            if !keep_existing {
                winners.insert(key, (line.index, best.score));
            }
        }

        for line in &mut lines {
            let Some(best) = line.candidates.first() else {
                continue;
            };
            let won = library
                .get(&best.clause_id)
                .map(|entry| UniquenessKey::for_entry(entry, title_keyed))
                .and_then(|key| winners.get(&key))
                .is_some_and(|&(index, _)| index == line.index);
            if won {
                line.outcome = LineOutcome::Matched {
                    result: best.clone(),
                };
            }
        }

        let review = LineReview {
            department: library.department().to_string(),
            reinsurer: library.reinsurer().to_string(),
            library_digest: library.digest().to_string(),
            lines,
        };
        tracing::debug!(
            lines = review.lines.len(),
            matched = review.matched_count(),
            protected = review.protected_count(),
            "reviewed input lines"
        );
        review
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchThresholds;
    use crate::normalizer::{IgnoreList, Normalizer};
    use crate::status::MatchStatus;

    fn reviewer(protected: &[&str]) -> LineReviewer {
        LineReviewer::new(
            Matcher::new(
                Normalizer::new(IgnoreList::with_builtin_boilerplate(["LM7", "Temporary"])),
                MatchThresholds::default(),
            ),
            ProtectedPhrases::new(protected),
            vec!["Liability".to_string()],
        )
    }

    fn property_library() -> ClauseLibrary {
        ClauseLibrary::new(
            "Property / Special Risks",
            "Zurich",
            vec![
                ClauseEntry::new("1", "Flood Extension", "flood inundation").with_limit("USD 1m"),
                ClauseEntry::new("2", "Flood Extension", "flood inundation storm surge")
                    .with_limit("USD 5m"),
                ClauseEntry::new("3", "Riot Extension", "strike riot civil commotion"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_split_lines_strips_bullets_and_blanks() {
        let lines = split_lines("• Flood extension\n\n  - Riot cover –\n   \n* Storm");
        assert_eq!(lines, vec!["Flood extension", "Riot cover", "Storm"]);
    }

    #[test]
    fn test_each_line_matched_independently() {
        let review = reviewer(&[]).review("Flood and inundation\nStrike riot civil commotion", &property_library());
        assert_eq!(review.lines.len(), 2);
        assert_eq!(review.lines[0].assigned().map(|r| r.clause_id.as_str()), Some("1"));
        assert_eq!(review.lines[1].assigned().map(|r| r.clause_id.as_str()), Some("3"));
        assert_eq!(review.matched_count(), 2);
    }

    #[test]
    fn test_clause_assigned_to_best_line_only() {
        let review = reviewer(&[]).review("riot\nStrike riot civil commotion", &property_library());
        assert!(matches!(review.lines[0].outcome, LineOutcome::Unmatched));
        assert_eq!(review.lines[0].candidates.len(), 1);
        assert_eq!(review.lines[1].assigned().map(|r| r.clause_id.as_str()), Some("3"));
    }

    #[test]
    fn test_equal_scores_keep_earlier_line() {
        let review = reviewer(&[]).review("riot strike\ncivil commotion", &property_library());
        assert_eq!(review.lines[0].assigned().map(|r| r.clause_id.as_str()), Some("3"));
        assert!(review.lines[1].assigned().is_none());
        assert_eq!(review.unmatched_count(), 1);
    }

    #[test]
    fn test_title_and_limit_key_keeps_distinct_limits() {
        let review = reviewer(&[]).review("flood inundation\nstorm surge", &property_library());
        assert_eq!(review.lines[0].assigned().map(|r| r.clause_id.as_str()), Some("1"));
        assert_eq!(review.lines[1].assigned().map(|r| r.clause_id.as_str()), Some("1"));
    }

    #[test]
    fn test_title_keyed_department_dedupes_by_title() {
        let lib = ClauseLibrary::new(
            "Liability",
            "Kiln",
            vec![
                ClauseEntry::new("1", "Pollution Exclusion", "pollution contamination").with_limit("A"),
                ClauseEntry::new("2", "Pollution Exclusion", "pollution seepage").with_limit("B"),
            ],
        )
        .unwrap();
        let review = reviewer(&[]).review("pollution contamination\npollution seepage", &lib);
        assert_eq!(review.matched_count(), 1);
        assert_eq!(review.lines[0].assigned().map(|r| r.clause_id.as_str()), Some("1"));
    }

    #[test]
    fn test_protected_lines_never_matched() {
        let review = reviewer(&["LM7", "Payment Warranty"]).review(
            "War and invasion LM-7\nFlood inundation\nPremium payment/warranty 60 days\nRiot LM 7",
            &property_library(),
        );
        assert!(review.lines[0].is_protected());
        assert!(review.lines[0].candidates.is_empty());
        assert!(!review.lines[1].is_protected());
        assert!(review.lines[2].is_protected());
        assert!(review.lines[2].candidates.is_empty());
        assert!(review.lines[3].is_protected());
        assert_eq!(review.protected_count(), 3);
        assert_eq!(review.lines[1].assigned().map(|r| r.clause_id.as_str()), Some("1"));
    }

    #[test]
    fn test_protected_phrase_ignores_separators() {
        let protected = ProtectedPhrases::new(["LM7"]);
        assert!(protected.matches("LM7 wording"));
        assert!(protected.matches("LM-7 wording"));
        assert!(protected.matches("LM 7 wording"));
        assert!(protected.matches("War exclusion (lm - 7)"));
        assert!(!protected.matches("LM 8 wording"));
        assert!(!protected.matches("LM 75 wording"));
        assert!(!protected.matches("ALM 7 wording"));

        let warranty = ProtectedPhrases::new(["Payment Warranty"]);
        assert!(warranty.matches("premium payment-warranty"));
        assert!(!warranty.matches("payment of warranty"));
    }

    #[test]
    fn test_protected_phrase_is_case_insensitive() {
        let protected = ProtectedPhrases::new(["Temporary"]);
        assert!(protected.matches("TEMPORARY removal of property"));
        assert!(!protected.matches("temporal limits"));
        assert!(!ProtectedPhrases::default().matches("anything"));
    }

    #[test]
    fn test_empty_input_and_empty_library() {
        let review = reviewer(&[]).review("", &property_library());
        assert!(review.lines.is_empty());
        let empty = ClauseLibrary::empty("Property / Special Risks", "QBE");
        let review = reviewer(&[]).review("flood", &empty);
        assert_eq!(review.lines.len(), 1);
        assert!(review.lines[0].assigned().is_none());
    }

    #[test]
    fn test_assigned_results_keep_engine_status() {
        let review = reviewer(&[]).review("flood", &property_library());
        let result = review.lines[0].assigned().unwrap();
        assert_eq!(result.status, MatchStatus::PartialMatch);
    }

    #[test]
    fn test_from_config_uses_protected_and_departments() {
        let mut config = EngineConfig::default();
        config.protected_phrases = vec!["Temporary".into()];
        let reviewer = LineReviewer::from_config(&config).unwrap();
        let review = reviewer.review("Temporary removal\nflood inundation", &property_library());
        assert!(review.lines[0].is_protected());
        assert!(review.lines[1].assigned().is_some());
    }
}
