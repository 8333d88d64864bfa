/// Custom mapping example - a mapper turning one value into several cells
use furnace_csv::{CsvDefinition, FieldSpec, JsonDocument, JsonToCsvConverter};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    println!("=== Custom Field Mapping ===\n");

    let data = json!({"name": "Furnace"});

    // The mapper writes the name twice; the header still has one NAME column
    let name = FieldSpec::new("NAME", "name").map_with(|_field: &FieldSpec, value: Option<&str>| {
        let value = value.unwrap_or_default().to_string();
        vec![value.clone(), value]
    });

    let upper = FieldSpec::new("UPPER", "name").map_with(|_field: &FieldSpec, value: Option<&str>| {
        value.map(|v| vec![v.to_uppercase()]).unwrap_or_default()
    });

    let definition = CsvDefinition::new("Custom Mapping Example", vec![name, upper]);

    println!("CSV output:");
    let converter = JsonToCsvConverter::new(definition);
    converter.write_document(&JsonDocument::new(data), std::io::stdout())?;

    println!("\n✓ Done! The data row has one cell more than the header");
    Ok(())
}
