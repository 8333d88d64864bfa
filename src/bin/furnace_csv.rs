//! furnace-csv: Flatten nested JSON into a CSV table
//!
//! Usage:
//!   # Columns on the command line, output to stdout
//!   furnace-csv data.json -f NAME=name -f "TENANT ID=tenants[*].id"
//!
//!   # Columns and CSV format from a definition file, output to a file
//!   furnace-csv data.json --definition tenants.json --output out/tenants.csv
//!
//!   # Read NDJSON from stdin, one header for all lines
//!   cat events.jsonl | furnace-csv --ndjson -f ID=id -f "TAG=tags[*]" --required ID

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use furnace_csv::flatten::{open_target, validate_field_paths};
use furnace_csv::logging::init_logging;
use furnace_csv::{
    Charset, ConversionStats, CsvDefinition, CsvWriter, FieldSpec, JsonDocument,
    JsonToCsvConverter,
};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "furnace-csv")]
#[command(about = "Flatten nested JSON into a CSV table", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// JSON definition file with the columns and CSV format
    #[arg(long, short = 'd')]
    definition: Option<String>,

    /// Column as NAME=PATH, repeatable; appended after definition file columns
    #[arg(long = "field", short = 'f', value_name = "NAME=PATH")]
    fields: Vec<String>,

    /// Mark a column as required: rows without a value for it are skipped
    #[arg(long = "required", value_name = "NAME")]
    required: Vec<String>,

    /// Output file (stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<String>,

    /// Column delimiter (default: ';')
    #[arg(long)]
    delimiter: Option<char>,

    /// Text encapsulator (default: '"')
    #[arg(long)]
    quote: Option<char>,

    /// Record delimiter, accepts \r \n \t escapes (default: "\r\n")
    #[arg(long)]
    record_delimiter: Option<String>,

    /// Output charset: UTF-8, UTF-16LE, UTF-16BE, ISO-8859-1, US-ASCII
    #[arg(long)]
    encoding: Option<String>,

    /// Append to the output file instead of truncating it
    #[arg(long)]
    append: bool,

    /// Process newline-delimited JSON (one JSON document per line)
    #[arg(long)]
    ndjson: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    });

    let definition = build_definition(&args)?;
    let converter = JsonToCsvConverter::new(definition);

    let stats = if args.ndjson {
        process_ndjson(&args, &converter)?
    } else {
        process_document(&args, &converter)?
    };

    info!(
        "{} rows assembled, {} written, {} dropped",
        stats.rows_assembled, stats.rows_written, stats.rows_dropped
    );
    Ok(())
}

/// Definition file first, then command line columns and format overrides
fn build_definition(args: &Args) -> Result<CsvDefinition> {
    let mut definition = match &args.definition {
        Some(path) => CsvDefinition::from_json_file(path)
            .with_context(|| format!("Failed to load definition {}", path))?,
        None => CsvDefinition::new("stdout", Vec::new()),
    };

    for raw in &args.fields {
        definition.fields.push(parse_field(raw)?);
    }

    for name in &args.required {
        match definition.fields.iter_mut().find(|field| &field.name == name) {
            Some(field) => field.required = true,
            None => bail!("--required names unknown column '{}'", name),
        }
    }

    if definition.fields.is_empty() {
        bail!("No columns defined: pass --definition or at least one --field NAME=PATH");
    }
    validate_field_paths(&definition.fields)?;

    if let Some(output) = &args.output {
        definition.name = output.clone();
    }

    let csv = &mut definition.csv;
    if let Some(delimiter) = args.delimiter {
        csv.column_delimiter = delimiter;
    }
    if let Some(quote) = args.quote {
        csv.text_encapsulator = quote;
    }
    if let Some(record_delimiter) = &args.record_delimiter {
        csv.record_delimiter = unescape(record_delimiter);
    }
    if let Some(encoding) = &args.encoding {
        csv.encoding = encoding.parse::<Charset>()?;
    }
    if args.append {
        csv.append = true;
    }
    csv.validate()?;

    Ok(definition)
}

fn parse_field(raw: &str) -> Result<FieldSpec> {
    match raw.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() => Ok(FieldSpec::new(name.trim(), path.trim())),
        _ => bail!("Invalid --field '{}', expected NAME=PATH", raw),
    }
}

fn unescape(raw: &str) -> String {
    raw.replace("\\r", "\r")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
}

fn open_input(input: &Option<String>) -> Result<Box<dyn Read>> {
    Ok(match input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path))?,
        )),
        None => Box::new(std::io::stdin()),
    })
}

/// Convert a single JSON document
fn process_document(args: &Args, converter: &JsonToCsvConverter) -> Result<ConversionStats> {
    let document = JsonDocument::from_reader(open_input(&args.input)?)
        .context("Failed to parse JSON input")?;

    let stats = match &args.output {
        Some(output) => converter
            .convert_to_file(&document, output)
            .with_context(|| format!("Failed to write {}", output))?,
        None => {
            let stdout = std::io::stdout();
            converter.write_document(&document, BufWriter::new(stdout.lock()))?
        }
    };
    Ok(stats)
}

/// Convert every line of an NDJSON stream into one table
fn process_ndjson(args: &Args, converter: &JsonToCsvConverter) -> Result<ConversionStats> {
    let reader: Box<dyn BufRead> = Box::new(BufReader::new(open_input(&args.input)?));
    let config = converter.definition().csv.clone();

    let writer: Box<dyn Write> = match &args.output {
        Some(output) => Box::new(BufWriter::new(
            open_target(Path::new(output), config.append)
                .with_context(|| format!("Failed to open {}", output))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let mut sink = CsvWriter::new(writer, config)?;
    let stats = converter
        .convert_ndjson(reader, &mut sink)
        .context("Failed to convert NDJSON input")?;
    Ok(stats)
}
