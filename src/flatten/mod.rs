//! JSON flattening - turn nested JSON into rows of a CSV table
//!
//! A conversion runs in three steps:
//!
//! 1. `plan` resolves every field path against the document into a
//!    deduplicated path tree that knows the length of every array instance.
//! 2. `rows` walks the tree and enumerates complete rows of cell descriptors,
//!    one branch per array element.
//! 3. `materialize` reads the values of a row and applies the required,
//!    omitted and mapper policies before `writer` encodes it.

pub mod converter;
pub mod materialize;
pub mod plan;
pub mod rows;
pub mod writer;

pub use converter::{open_target, ConversionStats, JsonToCsvConverter};
pub use materialize::RowMaterializer;
pub use plan::{
    build_path_tree, validate_field_paths, NodeId, NodeKind, PathNode, PathTree, PathTreeBuilder,
};
pub use rows::{CellDescriptor, RowEnumerator};
pub use writer::{CsvWriter, MemorySink, RecordSink};
