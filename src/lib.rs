//! # Furnace CSV - JSON to CSV flattening
//!
//! Turns a nested JSON document into the rows of a CSV table. Each column is
//! a field with a path into the document; `[*]` in a path stands for every
//! element of an array. Arrays expand into one row per element, nested
//! arrays into one row per element of the innermost array, and values
//! outside the arrays repeat on every row.
//!
//! ## Modules
//!
//! - **flatten**: path tree, row enumeration, materialization and CSV output
//! - **document**: path lookups on a parsed JSON document
//! - **types**: field and CSV definitions
//!
//! ## Quick Start
//!
//! ```rust
//! use furnace_csv::{convert_json, CsvDefinition, FieldSpec};
//!
//! # fn main() -> furnace_csv::Result<()> {
//! let definition = CsvDefinition::new(
//!     "tenants",
//!     vec![
//!         FieldSpec::new("NAME", "name"),
//!         FieldSpec::new("TENANT ID", "tenants[*].id"),
//!     ],
//! );
//!
//! let input = r#"{"name": "N", "tenants": [{"id": "t1"}, {"id": "t2"}]}"#;
//! let mut output = Vec::new();
//! let stats = convert_json(input.as_bytes(), &definition, &mut output)?;
//!
//! assert_eq!(stats.rows_written, 2);
//! assert_eq!(
//!     String::from_utf8(output).unwrap(),
//!     "NAME;TENANT ID\r\nN;t1\r\nN;t2\r\n"
//! );
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};

pub mod document;
pub mod error;
pub mod flatten;
pub mod logging;
pub mod path;
pub mod types;

// Re-export commonly used types for convenience
pub use document::{DocumentQuery, JsonDocument};
pub use error::{ConvertError, PathError, Result};
pub use flatten::{ConversionStats, CsvWriter, JsonToCsvConverter, MemorySink, RecordSink};
pub use types::{Charset, CsvConfig, CsvDefinition, FieldPath, FieldSpec, ValueMapper};

/// Main entry point: convert one JSON document into CSV
pub fn convert_json<R: Read, W: Write>(
    reader: R,
    definition: &CsvDefinition,
    writer: W,
) -> Result<ConversionStats> {
    JsonToCsvConverter::new(definition.clone()).convert_reader(reader, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_conversion() {
        let definition = CsvDefinition::new(
            "emails",
            vec![
                FieldSpec::new("NAME", "name"),
                FieldSpec::new("EMAIL", "emails[*]"),
            ],
        );

        let input = r#"{"name": "Alice", "emails": ["a@x", "b@x"]}"#;
        let mut output = Vec::new();
        let stats = convert_json(input.as_bytes(), &definition, &mut output).unwrap();

        assert_eq!(stats.rows_written, 2);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "NAME;EMAIL\r\nAlice;a@x\r\nAlice;b@x\r\n"
        );
    }
}
