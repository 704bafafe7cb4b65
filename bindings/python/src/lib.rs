//! Python bindings for the Nervyra clause matching engine
//!
//! Thin wrapper around `nervyra-core`. Libraries, configuration and results
//! cross the boundary as JSON strings; all behavior comes from the Rust core.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use nervyra_core::{
    ClauseLibrary, EngineConfig, LibraryContext, LineReviewer, MatchAction, MatchStatus, Matcher,
    Normalizer,
};

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_config(config_json: Option<&str>) -> PyResult<EngineConfig> {
    match config_json {
        Some(json) => EngineConfig::from_json_str(json).map_err(value_error),
        None => Ok(EngineConfig::default()),
    }
}

/// Same document and legacy formats the CLI accepts.
fn parse_library(library_json: &str) -> PyResult<ClauseLibrary> {
    nervyra_core::parse_library(library_json, &LibraryContext::default()).map_err(value_error)
}

/// Normalize clause text to its sorted token set.
///
/// Guarantees:
///   - Deterministic: same text and configuration → same tokens
///   - Idempotent: normalize(", ".join(normalize(x))) == normalize(x)
///
/// Args:
///     text: clause wording
///     config_json: optional engine configuration as a JSON string
///
/// Returns:
///     Sorted list of tokens
///
/// Raises:
///     ValueError: If the configuration is invalid
#[pyfunction]
#[pyo3(signature = (text, config_json=None))]
fn normalize(text: &str, config_json: Option<&str>) -> PyResult<Vec<String>> {
    let config = parse_config(config_json)?;
    Ok(Normalizer::from_config(&config).normalize(text).to_strings())
}

/// Match text against a clause library as one query.
///
/// Args:
///     library_json: {"department": ..., "reinsurer": ..., "clauses": [...]}
///         or a bare list of clause records
///     text: clause wording typed by the user
///     config_json: optional engine configuration as a JSON string
///
/// Returns:
///     JSON string of the ranked result set
///
/// Raises:
///     ValueError: If the library or configuration is invalid
#[pyfunction]
#[pyo3(signature = (library_json, text, config_json=None))]
fn match_text(library_json: &str, text: &str, config_json: Option<&str>) -> PyResult<String> {
    let matcher = Matcher::from_config(&parse_config(config_json)?).map_err(value_error)?;
    let library = parse_library(library_json)?;
    let set = matcher.match_text(text, &library);

    serde_json::to_string_pretty(&set)
        .map_err(|e| PyValueError::new_err(format!("Serialization error: {}", e)))
}

/// Review multi-line wording, assigning each library clause to one line.
///
/// Args:
///     library_json: {"department": ..., "reinsurer": ..., "clauses": [...]}
///         or a bare list of clause records
///     text: pasted wording, one clause per line
///     config_json: optional engine configuration as a JSON string
///
/// Returns:
///     JSON string of the line review
///
/// Raises:
///     ValueError: If the library or configuration is invalid
#[pyfunction]
#[pyo3(signature = (library_json, text, config_json=None))]
fn review_lines(library_json: &str, text: &str, config_json: Option<&str>) -> PyResult<String> {
    let reviewer = LineReviewer::from_config(&parse_config(config_json)?).map_err(value_error)?;
    let library = parse_library(library_json)?;
    let review = reviewer.review(text, &library);

    serde_json::to_string_pretty(&review)
        .map_err(|e| PyValueError::new_err(format!("Serialization error: {}", e)))
}

/// Apply a review action to a match status.
///
/// Args:
///     status: "matched", "partial_match", "rejected" or "overridden"
///     action: "accept", "override" or "reject"
///
/// Returns:
///     The new status
///
/// Raises:
///     ValueError: If either name is unknown or the transition is illegal
#[pyfunction]
fn transition(status: &str, action: &str) -> PyResult<String> {
    let status: MatchStatus = status.parse().map_err(value_error)?;
    let action: MatchAction = action.parse().map_err(value_error)?;
    let next = status.apply(action).map_err(value_error)?;
    Ok(next.as_str().to_string())
}

/// Nervyra Python module — deterministic clause matching
#[pymodule]
fn nervyra(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalize, m)?)?;
    m.add_function(wrap_pyfunction!(match_text, m)?)?;
    m.add_function(wrap_pyfunction!(review_lines, m)?)?;
    m.add_function(wrap_pyfunction!(transition, m)?)?;
    Ok(())
}
