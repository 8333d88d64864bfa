/// Nested example - arrays inside arrays inside arrays, written to a file
use furnace_csv::{CsvDefinition, FieldSpec, JsonDocument, JsonToCsvConverter};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    println!("=== Nested Arrays ===\n");

    let data = json!({
        "name": "Furnace",
        "version": "1.2.0",
        "date": "2024-05-01",
        "options": {"name": "default"},
        "tenants": [
            {
                "id": "t1",
                "name": "Acme",
                "organizations": [
                    {
                        "id": "o1",
                        "name": "Sales",
                        "created": "2023-01-10",
                        "pos": [
                            {"id": "p1", "title": "Front desk"},
                            {"id": "p2", "title": "Kiosk"}
                        ]
                    },
                    {"id": "o2", "name": "Support", "created": "2023-02-14", "pos": []}
                ]
            },
            {"id": "t2", "name": "Globex", "organizations": []}
        ]
    });

    let definition = CsvDefinition::new(
        "Nested Example",
        vec![
            FieldSpec::new("NAME", "name"),
            FieldSpec::new("VERSION", "version"),
            FieldSpec::new("DATE", "date"),
            FieldSpec::new("OPTION", "options.name"),
            FieldSpec::new("TENANT ID", "tenants[*].id"),
            FieldSpec::new("TENANT NAME", "tenants[*].name"),
            FieldSpec::new("ORGANIZATION ID", "tenants[*].organizations[*].id"),
            FieldSpec::new("ORGANIZATION NAME", "tenants[*].organizations[*].name"),
            FieldSpec::new("ORGANIZATION CREATED", "tenants[*].organizations[*].created"),
            FieldSpec::new("POS ID", "tenants[*].organizations[*].pos[*].id"),
            FieldSpec::new("POS TITLE", "tenants[*].organizations[*].pos[*].title"),
        ],
    );

    let target = std::env::temp_dir().join("furnace-csv-demo").join("nested.csv");
    let converter = JsonToCsvConverter::new(definition);
    let stats = converter.convert_to_file(&JsonDocument::new(data), &target)?;

    println!("✓ Done! {} rows written to {}\n", stats.rows_written, target.display());
    println!("{}", std::fs::read_to_string(&target)?);

    // t1/o1 has two points of sale, t1/o2 and t2 have none: 2 + 1 + 1 rows
    println!("Try: cat {}", target.display());
    Ok(())
}
