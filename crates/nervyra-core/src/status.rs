//! Match status lifecycle
//!
//! The engine only ever emits `Matched` or `PartialMatch`. Every later state
//! is reached through a user action taken in the review workflow.
//!
//! ```text
//! Matched ──override──▶ Overridden (terminal)
//!    │
//!    └──reject───▶ Rejected (terminal)
//!
//! PartialMatch ──accept──▶ Matched
//!    │
//!    └──reject───▶ Rejected (terminal)
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ── Status ────────────────────────────────────────────────

/// Review status of a single match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Score reached the full-match threshold, or a partial match was accepted.
    Matched,
    /// Score reached the partial threshold only; needs review.
    PartialMatch,
    /// Discarded by the user (terminal).
    Rejected,
    /// Replaced by user-edited wording (terminal).
    Overridden,
}

/// A user action from the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAction {
    Accept,
    Override,
    Reject,
}

/// Every legal `(from, action, to)` triple. Anything not listed is refused.
pub const LEGAL_TRANSITIONS: [(MatchStatus, MatchAction, MatchStatus); 4] = [
    (MatchStatus::Matched, MatchAction::Override, MatchStatus::Overridden),
    (MatchStatus::Matched, MatchAction::Reject, MatchStatus::Rejected),
    (MatchStatus::PartialMatch, MatchAction::Accept, MatchStatus::Matched),
    (MatchStatus::PartialMatch, MatchAction::Reject, MatchStatus::Rejected),
];

impl MatchStatus {
    /// Whether the engine may emit this status.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Matched | Self::PartialMatch)
    }

    /// Whether no further action is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Overridden)
    }

    /// Whether the result belongs in the final, exported clause set.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Matched | Self::Overridden)
    }

    /// Target status for `action`, or `None` if the transition is illegal.
    pub fn next(&self, action: MatchAction) -> Option<MatchStatus> {
        LEGAL_TRANSITIONS
            .iter()
            .find(|(from, act, _)| from == self && *act == action)
            .map(|(_, _, to)| *to)
    }

    /// Apply `action`, returning the new status.
    ///
    /// # Errors
    /// Returns `InvalidTransition` when the action is not in the legal table.
    pub fn apply(self, action: MatchAction) -> Result<MatchStatus> {
        self.next(action).ok_or(Error::InvalidTransition { from: self, action })
    }

    /// Stable lowercase name, used in JSON and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::PartialMatch => "partial_match",
            Self::Rejected => "rejected",
            Self::Overridden => "overridden",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "matched" => Ok(Self::Matched),
            "partial_match" | "partial" => Ok(Self::PartialMatch),
            "rejected" => Ok(Self::Rejected),
            "overridden" => Ok(Self::Overridden),
            other => Err(Error::UnknownName(format!("match status '{}'", other))),
        }
    }
}

impl MatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Override => "override",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for MatchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(Self::Accept),
            "override" => Ok(Self::Override),
            "reject" => Ok(Self::Reject),
            other => Err(Error::UnknownName(format!("match action '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [MatchStatus; 4] = [
        MatchStatus::Matched,
        MatchStatus::PartialMatch,
        MatchStatus::Rejected,
        MatchStatus::Overridden,
    ];
    const ALL_ACTIONS: [MatchAction; 3] =
        [MatchAction::Accept, MatchAction::Override, MatchAction::Reject];

    #[test]
    fn test_listed_transitions_succeed() {
        assert_eq!(
            MatchStatus::Matched.apply(MatchAction::Override).unwrap(),
            MatchStatus::Overridden
        );
        assert_eq!(
            MatchStatus::Matched.apply(MatchAction::Reject).unwrap(),
            MatchStatus::Rejected
        );
        assert_eq!(
            MatchStatus::PartialMatch.apply(MatchAction::Accept).unwrap(),
            MatchStatus::Matched
        );
        assert_eq!(
            MatchStatus::PartialMatch.apply(MatchAction::Reject).unwrap(),
            MatchStatus::Rejected
        );
    }

    #[test]
    fn test_partial_cannot_be_overridden_directly() {
        let err = MatchStatus::PartialMatch
            .apply(MatchAction::Override)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: MatchStatus::PartialMatch,
                action: MatchAction::Override
            }
        ));
    }

    #[test]
    fn test_only_listed_transitions_are_legal() {
        let mut legal = 0;
        for from in ALL_STATUSES {
            for action in ALL_ACTIONS {
                let listed = LEGAL_TRANSITIONS
                    .iter()
                    .any(|(f, a, _)| *f == from && *a == action);
                assert_eq!(
                    from.apply(action).is_ok(),
                    listed,
                    "{} --{}--> mismatch with table",
                    from,
                    action
                );
                if listed {
                    legal += 1;
                }
            }
        }
        assert_eq!(legal, 4);
    }

    #[test]
    fn test_terminal_states_refuse_everything() {
        for from in [MatchStatus::Rejected, MatchStatus::Overridden] {
            assert!(from.is_terminal());
            for action in ALL_ACTIONS {
                assert!(from.next(action).is_none());
            }
        }
    }

    #[test]
    fn test_matched_cannot_be_accepted_again() {
        assert!(MatchStatus::Matched.apply(MatchAction::Accept).is_err());
    }

    #[test]
    fn test_initial_and_accepted_sets() {
        assert!(MatchStatus::Matched.is_initial());
        assert!(MatchStatus::PartialMatch.is_initial());
        assert!(!MatchStatus::Rejected.is_initial());
        assert!(MatchStatus::Overridden.is_accepted());
        assert!(!MatchStatus::PartialMatch.is_accepted());
    }

    #[test]
    fn test_parse_and_display_agree() {
        for status in ALL_STATUSES {
            assert_eq!(status.to_string().parse::<MatchStatus>().unwrap(), status);
        }
        for action in ALL_ACTIONS {
            assert_eq!(action.to_string().parse::<MatchAction>().unwrap(), action);
        }
        assert!("approve".parse::<MatchAction>().is_err());
    }

    #[test]
    fn test_unknown_names_are_not_config_errors() {
        let err = "approve".parse::<MatchAction>().unwrap_err();
        assert!(matches!(err, Error::UnknownName(_)));
        assert_eq!(err.to_string(), "Unknown name: match action 'approve'");

        let err = "pending".parse::<MatchStatus>().unwrap_err();
        assert!(matches!(err, Error::UnknownName(_)));
        assert_eq!(err.to_string(), "Unknown name: match status 'pending'");
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&MatchStatus::PartialMatch).unwrap();
        assert_eq!(json, "\"partial_match\"");
    }
}
