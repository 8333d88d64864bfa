/// Basic example - flat fields only, one row per document
use furnace_csv::{CsvDefinition, FieldSpec, JsonDocument, JsonToCsvConverter};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    println!("=== Basic Conversion ===\n");

    let data = json!({
        "name": "Furnace",
        "version": "1.2.0",
        "date": "2024-05-01",
        "options": {"advanced": true}
    });

    println!("Input JSON:");
    println!("{}\n", serde_json::to_string_pretty(&data)?);

    let definition = CsvDefinition::new(
        "Basic Example",
        vec![
            FieldSpec::new("NAME", "name"),
            FieldSpec::new("VERSION", "version"),
            FieldSpec::new("DATE", "date"),
            FieldSpec::new("OPTION", "options.advanced"),
        ],
    );

    println!("CSV output:");
    let converter = JsonToCsvConverter::new(definition);
    let stats = converter.write_document(&JsonDocument::new(data), std::io::stdout())?;

    println!("\n✓ Done! {} row written", stats.rows_written);
    Ok(())
}
