//! Point lookups into a parsed JSON document
//!
//! The path tree builder and the row materializer only ever ask two
//! questions of a document: "what is the value at this concrete path" and
//! "how long is the array at this concrete path". `DocumentQuery` is that
//! seam; `JsonDocument` answers it for an in-memory `serde_json::Value`.

use crate::error::Result;
use crate::path::{self, Step};
use serde_json::Value;
use std::io::Read;
use tracing::{debug, trace};

/// Read-only queries against a materialized document.
///
/// `None` means "not found" and is never an error: callers degrade it to an
/// empty value or an array of length zero.
pub trait DocumentQuery {
    /// String form of the scalar at `path`
    fn read_scalar(&self, path: &str) -> Option<String>;

    /// Length of the array at `path`
    fn read_array_length(&self, path: &str) -> Option<usize>;
}

/// A fully parsed JSON document
#[derive(Debug, Clone)]
pub struct JsonDocument {
    root: Value,
}

impl JsonDocument {
    pub fn new(root: Value) -> Self {
        JsonDocument { root }
    }

    /// Parse a document from raw bytes, using SIMD parsing when it succeeds
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        // simd-json parses in place, so it gets a scratch copy
        let mut scratch = bytes.to_vec();
        match simd_json::serde::from_slice::<Value>(&mut scratch) {
            Ok(root) => Ok(Self::new(root)),
            Err(err) => {
                debug!("SIMD parse failed ({}), retrying with serde_json", err);
                Ok(Self::new(serde_json::from_slice(bytes)?))
            }
        }
    }

    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        Self::from_slice(&content)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Resolve a concrete path (no wildcards) to the value it points at
    pub fn lookup(&self, concrete_path: &str) -> Option<&Value> {
        if concrete_path.is_empty() {
            return Some(&self.root);
        }

        let steps = match path::parse_steps(concrete_path) {
            Ok(steps) => steps,
            Err(err) => {
                trace!("Cannot query path {}: {}", concrete_path, err);
                return None;
            }
        };

        let mut current = &self.root;
        for step in &steps {
            current = match (step, current) {
                (Step::Key(key), Value::Object(map)) => map.get(key)?,
                (Step::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<Value> for JsonDocument {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

impl DocumentQuery for JsonDocument {
    fn read_scalar(&self, path: &str) -> Option<String> {
        match self.lookup(path)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            // Nested structures are rendered as compact JSON
            other => Some(other.to_string()),
        }
    }

    fn read_array_length(&self, path: &str) -> Option<usize> {
        match self.lookup(path)? {
            Value::Array(items) => Some(items.len()),
            _ => None,
        }
    }
}
