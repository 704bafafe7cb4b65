//! Nervyra Core - clause matching engine for reinsurance wording
//!
//! Matches free-text clause wording typed by an underwriter against a
//! department/reinsurer clause library and tracks each match through review.
//! The CLI and the Python binding are thin shells over this crate.
//!
//! # Architecture
//!
//! ```text
//! Text → Normalizer → TokenSet ─┐
//!                               ├→ Matcher → ResultSet → review actions (MatchStatus)
//! ClauseLibrary → TokenCache ───┘      ↓
//!                               LineReviewer → LineReview (one clause per line)
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same text, library and configuration always produce
//!   the same results in the same order
//! - **Pure**: matching never mutates the library; only the token cache is
//!   filled, and it is invisible to results
//! - **Explicit configuration**: no globals; everything tunable is passed in
//!   through [`EngineConfig`]
//! - **Closed lifecycle**: result statuses only change through
//!   [`MatchStatus::apply`], which refuses illegal transitions

pub mod config;
pub mod error;
pub mod highlight;
pub mod library;
pub mod loader;
pub mod matcher;
pub mod normalizer;
pub mod result;
pub mod review;
pub mod status;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use highlight::{annotate_completion, annotate_entry, CompletionSegment};
pub use library::{ClauseEntry, ClauseId, ClauseLibrary, TokenCache};
pub use loader::{load_library, parse_library, LibraryContext};
pub use matcher::{
    match_tokens, overlap_score, MatchResult, MatchThresholds, Matcher, FULL_MATCH_THRESHOLD,
    PARTIAL_THRESHOLD,
};
pub use normalizer::{normalize, IgnoreList, NormalizedToken, Normalizer, TokenSet};
pub use result::{ResultSet, StatusCounts};
pub use review::{LineMatch, LineOutcome, LineReview, LineReviewer, ProtectedPhrases};
pub use status::{MatchAction, MatchStatus, LEGAL_TRANSITIONS};
