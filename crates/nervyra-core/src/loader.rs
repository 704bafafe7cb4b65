//! Clause library documents
//!
//! The one parser for library JSON, shared by every front end.
//!
//! Accepts either a document `{ "department", "reinsurer", "clauses": [...] }`
//! or a bare array of clause records. Records may use the engine's field names
//! (`id`, `title`, `bodyText`, `keywords`, `limit`) or the legacy library
//! names (`Name of Clause`, `Keywords`, `Limit`). Legacy records carry no body
//! text; their title stands in for it. Records without an id get their 1-based
//! position, and numeric ids are kept as their decimal text.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::library::{ClauseEntry, ClauseId, ClauseLibrary};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LibraryFile {
    Document(LibraryDocument),
    Bare(Vec<RawClause>),
}

#[derive(Debug, Deserialize)]
struct LibraryDocument {
    #[serde(default)]
    department: String,
    #[serde(default)]
    reinsurer: String,
    clauses: Vec<RawClause>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawClause {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(alias = "Name of Clause")]
    title: String,
    #[serde(default, rename = "bodyText", alias = "body_text")]
    body_text: Option<String>,
    #[serde(default)]
    department: Option<String>,
    #[serde(default)]
    reinsurer: Option<String>,
    #[serde(default, alias = "Keywords")]
    keywords: Vec<String>,
    #[serde(default, alias = "Limit")]
    limit: Option<String>,
}

impl RawClause {
    fn into_entry(self, position: usize, department: &str, reinsurer: &str) -> ClauseEntry {
        let id = match self.id {
            Some(RawId::Number(n)) => ClauseId::new(n.to_string()),
            Some(RawId::Text(s)) => ClauseId::new(s),
            None => ClauseId::from(position + 1),
        };
        let body = self
            .body_text
            .filter(|b| !b.trim().is_empty())
            .unwrap_or_else(|| self.title.clone());

        let mut entry = ClauseEntry::new(id, self.title, body)
            .with_context(
                self.department.unwrap_or_else(|| department.to_string()),
                self.reinsurer.unwrap_or_else(|| reinsurer.to_string()),
            )
            .with_keywords(self.keywords);
        if let Some(limit) = self.limit {
            entry = entry.with_limit(limit);
        }
        entry
    }
}

/// Department/reinsurer chosen by the caller; they win over the document.
#[derive(Debug, Default, Clone)]
pub struct LibraryContext {
    pub department: Option<String>,
    pub reinsurer: Option<String>,
}

/// Parse library JSON into a [`ClauseLibrary`].
///
/// # Errors
/// `InvalidLibrary` if the JSON is neither shape, `DuplicateClauseId` if two
/// records resolve to the same id.
pub fn parse_library(json: &str, context: &LibraryContext) -> Result<ClauseLibrary> {
    let file: LibraryFile = serde_json::from_str(json).map_err(|e| {
        Error::InvalidLibrary(format!(
            "neither a clause document nor a clause array ({})",
            e
        ))
    })?;

    let (file_department, file_reinsurer, clauses) = match file {
        LibraryFile::Document(doc) => (doc.department, doc.reinsurer, doc.clauses),
        LibraryFile::Bare(clauses) => (String::new(), String::new(), clauses),
    };
    let department = context.department.clone().unwrap_or(file_department);
    let reinsurer = context.reinsurer.clone().unwrap_or(file_reinsurer);

    let entries = clauses
        .into_iter()
        .enumerate()
        .map(|(position, raw)| raw.into_entry(position, &department, &reinsurer))
        .collect();

    ClauseLibrary::new(department, reinsurer, entries)
}

/// Read and parse a library file.
pub fn load_library(path: &Path, context: &LibraryContext) -> Result<ClauseLibrary> {
    let json = fs::read_to_string(path)?;
    let library = parse_library(&json, context)?;
    tracing::debug!(
        path = %path.display(),
        clauses = library.len(),
        digest = %library.digest(),
        "library file loaded"
    );
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_format() {
        let json = r#"{
            "department": "Property / Special Risks",
            "reinsurer": "Zurich",
            "clauses": [
                {"id": "flood", "title": "Flood Extension", "bodyText": "flood inundation"}
            ]
        }"#;
        let library = parse_library(json, &LibraryContext::default()).unwrap();
        assert_eq!(library.department(), "Property / Special Risks");
        assert_eq!(library.reinsurer(), "Zurich");
        let entry = library.get(&"flood".into()).unwrap();
        assert_eq!(entry.body_text, "flood inundation");
        assert_eq!(entry.reinsurer, "Zurich");
    }

    #[test]
    fn test_legacy_bare_array() {
        let json = r#"[
            {"Name of Clause": "Cross Liabilities", "Keywords": ["cross", "liabilities"], "Limit": ""},
            {"Name of Clause": "Contractual Liability", "Keywords": ["contractual"], "Limit": "USD 1m"}
        ]"#;
        let context = LibraryContext {
            department: Some("Liability".into()),
            reinsurer: Some("Kiln".into()),
        };
        let library = parse_library(json, &context).unwrap();
        assert_eq!(library.len(), 2);
        assert_eq!(library.department(), "Liability");

        let first = library.get(&"1".into()).unwrap();
        assert_eq!(first.title, "Cross Liabilities");
        assert_eq!(first.body_text, "Cross Liabilities");
        assert_eq!(first.keywords, vec!["cross", "liabilities"]);
        assert_eq!(first.limit_text(), None);

        let second = library.get(&"2".into()).unwrap();
        assert_eq!(second.display_text(), "Contractual Liability – USD 1m");
    }

    #[test]
    fn test_legacy_document_matches_like_engine_format() {
        let legacy = r#"{
            "department": "Liability",
            "reinsurer": "Kiln",
            "clauses": [
                {"id": 7, "Name of Clause": "Cross Liabilities", "Keywords": ["cross liabilities"], "Limit": ""}
            ]
        }"#;
        let library = parse_library(legacy, &LibraryContext::default()).unwrap();
        let entry = library.get(&"7".into()).unwrap();
        assert_eq!(entry.department, "Liability");

        let set = crate::Matcher::default().match_text("Cross liabilities", &library);
        assert_eq!(set.results.len(), 1);
        assert_eq!(set.results[0].clause_id.as_str(), "7");
    }

    #[test]
    fn test_numeric_ids() {
        let json = r#"[{"id": 7, "title": "War Exclusion", "bodyText": "war invasion"}]"#;
        let library = parse_library(json, &LibraryContext::default()).unwrap();
        assert!(library.get(&"7".into()).is_some());
    }

    #[test]
    fn test_caller_context_wins() {
        let json = r#"{"department": "Property", "reinsurer": "QBE", "clauses": []}"#;
        let context = LibraryContext {
            department: None,
            reinsurer: Some("SwiftRE".into()),
        };
        let library = parse_library(json, &context).unwrap();
        assert_eq!(library.department(), "Property");
        assert_eq!(library.reinsurer(), "SwiftRE");
        assert!(library.is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"[
            {"id": "a", "title": "One", "bodyText": "one"},
            {"id": "a", "title": "Two", "bodyText": "two"}
        ]"#;
        let err = parse_library(json, &LibraryContext::default()).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate clause id in library: a");
    }

    #[test]
    fn test_malformed_library_rejected() {
        let err = parse_library(r#"{"clauses": 3}"#, &LibraryContext::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidLibrary(_)));
        assert!(parse_library("not json", &LibraryContext::default()).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_library(Path::new("no/such/library.json"), &LibraryContext::default())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
