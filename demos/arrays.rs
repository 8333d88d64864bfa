/// Arrays example - one row per element of `emails`
use furnace_csv::{CsvDefinition, FieldSpec, JsonDocument, JsonToCsvConverter};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    println!("=== Array Expansion ===\n");

    let data = json!({
        "name": "Furnace",
        "version": "1.2.0",
        "date": "2024-05-01",
        "emails": ["dev@example.com", "ops@example.com", "support@example.com"]
    });

    println!("Input JSON:");
    println!("{}\n", serde_json::to_string_pretty(&data)?);

    let definition = CsvDefinition::new(
        "Arrays Example",
        vec![
            FieldSpec::new("NAME", "name"),
            FieldSpec::new("VERSION", "version"),
            FieldSpec::new("DATE", "date"),
            FieldSpec::new("EMAIL", "emails[*]"),
        ],
    );

    // NAME, VERSION and DATE repeat on every row
    println!("CSV output:");
    let converter = JsonToCsvConverter::new(definition);
    let stats = converter.write_document(&JsonDocument::new(data), std::io::stdout())?;

    println!("\n✓ Done! {} rows written", stats.rows_written);
    Ok(())
}
