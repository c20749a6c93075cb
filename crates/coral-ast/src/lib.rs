//! Surface AST for rinha programs.
//!
//! This crate's only job is ingest: deserialize the JSON AST wire format
//! into an immutable tree of tagged nodes with source locations, mirroring
//! the wire shape exactly. No resolution, no typing - that's `coral-sem`.

pub mod location;
pub mod term;

pub use location::Location;
pub use term::{BinaryOp, File, Parameter, Term};

use std::path::Path;

/// Errors that can occur while ingesting a JSON AST file.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed AST JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parse a JSON AST file from disk into a [`File`].
pub fn ingest_file(path: &Path) -> Result<File, IngestError> {
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })?;
    ingest_str(&text)
}

/// Parse a JSON AST already held in memory into a [`File`].
pub fn ingest_str(text: &str) -> Result<File, IngestError> {
    let file: File = serde_json::from_str(text)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingests_minimal_file() {
        let json = r#"{
            "name": "scenario.rinha",
            "expression": {
                "kind": "Int",
                "value": 1,
                "location": {"filename": "scenario.rinha", "line": 1, "start": 0, "end": 1}
            }
        }"#;
        let file = ingest_str(json).unwrap();
        assert_eq!(file.name, "scenario.rinha");
        match file.expression {
            Term::Int { value, .. } => assert_eq!(value, 1),
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ingest_str("{ not json").unwrap_err();
        assert!(matches!(err, IngestError::Parse(_)));
    }
}
