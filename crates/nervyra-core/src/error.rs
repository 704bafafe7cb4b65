//! Error types for the clause matching engine
//!
//! All fallible operations return `Result<T, Error>`.
//! Normalization and matching themselves never fail: an empty library,
//! empty text or a query with no overlap all produce empty output.

use thiserror::Error;

use crate::status::{MatchAction, MatchStatus};

/// Engine error types
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is structurally valid JSON but semantically unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Library JSON is neither a clause document nor a clause array
    #[error("Invalid library: {0}")]
    InvalidLibrary(String),

    /// Two library records share the same clause id
    #[error("Duplicate clause id in library: {0}")]
    DuplicateClauseId(String),

    /// A workflow action is not legal from the result's current status
    #[error("Invalid transition: cannot {action} a result that is {from}")]
    InvalidTransition { from: MatchStatus, action: MatchAction },

    /// A status or action name that the workflow does not define
    #[error("Unknown name: {0}")]
    UnknownName(String),

    /// A workflow action referenced a clause that is not in the result set
    #[error("Unknown clause id: {0}")]
    UnknownClause(String),

    /// Configuration or library file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or library is not valid JSON for the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_message_names_both_sides() {
        let err = Error::InvalidTransition {
            from: MatchStatus::PartialMatch,
            action: MatchAction::Override,
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot override a result that is partial_match"
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
