//! Error types for JSON to CSV conversion.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot open {path:?}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Field '{field}' has malformed path '{path}': {reason}")]
    MalformedPath {
        field: String,
        path: String,
        reason: PathError,
    },

    #[error("Path '{path}' is used both as an array and as a property")]
    ShapeConflict { path: String },

    #[error("Invalid CSV configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    #[error("Character {ch:?} cannot be encoded as {charset}")]
    Unencodable { charset: String, ch: char },
}

/// Reasons a path string is rejected by the path parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("invalid segment '{0}'")]
    InvalidSegment(String),

    #[error("array index '{0}' is out of range")]
    IndexOutOfRange(String),
}
