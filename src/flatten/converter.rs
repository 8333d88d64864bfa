//! End-to-end conversion of JSON documents into CSV tables
//!
//! A conversion builds the path tree first, so a bad field definition fails
//! before any output exists. Only then is the target opened, the header
//! written and the rows streamed one at a time to the sink.

use crate::document::{DocumentQuery, JsonDocument};
use crate::error::{ConvertError, Result};
use crate::flatten::materialize::RowMaterializer;
use crate::flatten::plan::{build_path_tree, validate_field_paths, PathTree};
use crate::flatten::rows::RowEnumerator;
use crate::flatten::writer::{CsvWriter, RecordSink};
use crate::types::CsvDefinition;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info, trace};

/// Row counts of one conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Complete rows found by enumeration
    pub rows_assembled: usize,

    /// Rows handed to the sink with at least one value
    pub rows_written: usize,

    /// Rows skipped because a required field had no value
    pub rows_dropped: usize,
}

impl ConversionStats {
    fn merge(&mut self, other: ConversionStats) {
        self.rows_assembled += other.rows_assembled;
        self.rows_written += other.rows_written;
        self.rows_dropped += other.rows_dropped;
    }
}

/// Converts JSON documents into rows of one CSV definition
pub struct JsonToCsvConverter {
    definition: CsvDefinition,
}

impl JsonToCsvConverter {
    pub fn new(definition: CsvDefinition) -> Self {
        JsonToCsvConverter { definition }
    }

    pub fn definition(&self) -> &CsvDefinition {
        &self.definition
    }

    /// Convert a document into any record sink
    pub fn convert_document<D, S>(&self, document: &D, sink: &mut S) -> Result<ConversionStats>
    where
        D: DocumentQuery + ?Sized,
        S: RecordSink + ?Sized,
    {
        let tree = self.plan(document)?;
        self.emit(document, &tree, sink)
    }

    pub fn convert_value<S: RecordSink + ?Sized>(
        &self,
        value: Value,
        sink: &mut S,
    ) -> Result<ConversionStats> {
        self.convert_document(&JsonDocument::new(value), sink)
    }

    /// Write a document as CSV to any writer
    pub fn write_document<W: Write>(
        &self,
        document: &JsonDocument,
        writer: W,
    ) -> Result<ConversionStats> {
        let tree = self.plan(document)?;
        let mut sink = CsvWriter::new(writer, self.definition.csv.clone())?;
        self.emit(document, &tree, &mut sink)
    }

    /// Read one JSON document from `reader` and write it as CSV to `writer`
    pub fn convert_reader<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<ConversionStats> {
        let document = JsonDocument::from_reader(reader)?;
        self.write_document(&document, writer)
    }

    /// Write a document as CSV to a file, creating its directory if needed
    pub fn convert_to_file<P: AsRef<Path>>(
        &self,
        document: &JsonDocument,
        target: P,
    ) -> Result<ConversionStats> {
        let tree = self.plan(document)?;
        self.definition.csv.validate()?;

        let file = open_target(target.as_ref(), self.definition.csv.append)?;
        let mut sink = CsvWriter::new(BufWriter::new(file), self.definition.csv.clone())?;
        self.emit(document, &tree, &mut sink)
    }

    /// Convert a JSON file into a CSV file
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        target: Q,
    ) -> Result<ConversionStats> {
        let source = source.as_ref();
        let file = File::open(source).map_err(|source_err| ConvertError::Open {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        let document = JsonDocument::from_reader(BufReader::new(file))?;
        self.convert_to_file(&document, target)
    }

    /// Convert newline-delimited JSON: one header, then the rows of every line
    pub fn convert_ndjson<R: BufRead, S: RecordSink + ?Sized>(
        &self,
        reader: R,
        sink: &mut S,
    ) -> Result<ConversionStats> {
        validate_field_paths(&self.definition.fields)?;
        sink.write_header(&self.definition.header())?;

        let mut stats = ConversionStats::default();
        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let document = JsonDocument::from_slice(line.as_bytes())?;
            let tree = self.plan(&document)?;
            let line_stats = self.write_rows(&document, &tree, sink)?;
            trace!("Line {} produced {:?}", line_number + 1, line_stats);
            stats.merge(line_stats);
        }

        sink.flush()?;
        info!(
            "CSV {} was successfully created: {} rows written, {} dropped",
            self.definition.name, stats.rows_written, stats.rows_dropped
        );
        Ok(stats)
    }

    fn plan<D: DocumentQuery + ?Sized>(&self, document: &D) -> Result<PathTree> {
        debug!("Building path tree for {}", self.definition.name);
        build_path_tree(document, &self.definition.fields)
    }

    fn emit<D, S>(&self, document: &D, tree: &PathTree, sink: &mut S) -> Result<ConversionStats>
    where
        D: DocumentQuery + ?Sized,
        S: RecordSink + ?Sized,
    {
        sink.write_header(&self.definition.header())?;
        debug!("Generating rows for {}", self.definition.name);

        let stats = self.write_rows(document, tree, sink)?;
        sink.flush()?;

        info!(
            "CSV {} was successfully created: {} rows written, {} dropped",
            self.definition.name, stats.rows_written, stats.rows_dropped
        );
        Ok(stats)
    }

    fn write_rows<D, S>(&self, document: &D, tree: &PathTree, sink: &mut S) -> Result<ConversionStats>
    where
        D: DocumentQuery + ?Sized,
        S: RecordSink + ?Sized,
    {
        let materializer = RowMaterializer::new(document);
        let mut stats = ConversionStats::default();

        let assembled = RowEnumerator::new(tree, &self.definition.fields).for_each_row(|row| {
            match materializer.materialize(row) {
                Some(values) => {
                    if !values.is_empty() {
                        stats.rows_written += 1;
                    }
                    sink.write_record(&values)
                }
                None => {
                    stats.rows_dropped += 1;
                    Ok(())
                }
            }
        })?;

        stats.rows_assembled = assembled;
        Ok(stats)
    }
}

/// Open a CSV target file, creating parent directories first
pub fn open_target(path: &Path, append: bool) -> Result<File> {
    let open_error = |source| ConvertError::Open {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(open_error)?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options.open(path).map_err(open_error)
}
