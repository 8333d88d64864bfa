//! Turns a complete row of cell descriptors into output values

use crate::document::DocumentQuery;
use crate::flatten::rows::CellDescriptor;
use tracing::{debug, trace};

/// Resolves cell descriptors against a document and applies the field policies
pub struct RowMaterializer<'a, D: DocumentQuery + ?Sized> {
    document: &'a D,
}

impl<'a, D: DocumentQuery + ?Sized> RowMaterializer<'a, D> {
    pub fn new(document: &'a D) -> Self {
        RowMaterializer { document }
    }

    /// Output values for `row`, or `None` when a required field has no value.
    ///
    /// Omitted fields contribute nothing. A mapper may contribute any number
    /// of values in place of the raw one; when it contributes none, the raw
    /// value is used, and a missing raw value becomes an empty cell.
    pub fn materialize(&self, row: &[CellDescriptor<'_>]) -> Option<Vec<String>> {
        let mut values = Vec::with_capacity(row.len());

        for cell in row {
            let Some(concrete_path) = cell.concrete_path() else {
                continue;
            };
            let field = cell.field;

            let value = self.document.read_scalar(&concrete_path);
            if value.is_none() {
                trace!("There is no value for path {}", concrete_path);
            }

            let mapped = field
                .mapper
                .as_ref()
                .map(|mapper| mapper.map(field, value.as_deref()))
                .unwrap_or_default();
            if !mapped.is_empty() {
                values.extend(mapped);
                continue;
            }

            match value {
                Some(value) => values.push(value),
                None if field.required => {
                    debug!(
                        "Required field '{}' has no value at {}, skipping the row",
                        field.name, concrete_path
                    );
                    return None;
                }
                None => values.push(String::new()),
            }
        }

        Some(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::JsonDocument;
    use crate::types::FieldSpec;
    use serde_json::json;

    fn cell<'a>(field_index: usize, field: &'a FieldSpec, indexes: &[usize]) -> CellDescriptor<'a> {
        CellDescriptor {
            field_index,
            field,
            indexes: indexes.to_vec(),
        }
    }

    fn document() -> JsonDocument {
        JsonDocument::new(json!({
            "name": "N",
            "emails": [
                {"address": "a@x", "active": true},
                {"address": "b@x"}
            ]
        }))
    }

    #[test]
    fn test_values_resolved_in_row_order() {
        let doc = document();
        let name = FieldSpec::new("NAME", "name");
        let address = FieldSpec::new("ADDRESS", "emails[*].address");
        let active = FieldSpec::new("ACTIVE", "emails[*].active");

        let materializer = RowMaterializer::new(&doc);
        let values = materializer
            .materialize(&[cell(0, &name, &[]), cell(1, &address, &[0]), cell(2, &active, &[0])])
            .unwrap();
        assert_eq!(values, vec!["N", "a@x", "true"]);

        let values = materializer
            .materialize(&[cell(0, &name, &[]), cell(1, &address, &[1]), cell(2, &active, &[1])])
            .unwrap();
        assert_eq!(values, vec!["N", "b@x", ""]);
    }

    #[test]
    fn test_required_field_without_value_drops_row() {
        let doc = document();
        let address = FieldSpec::new("ADDRESS", "emails[*].address");
        let active = FieldSpec::new("ACTIVE", "emails[*].active").required();

        let materializer = RowMaterializer::new(&doc);
        assert!(materializer
            .materialize(&[cell(0, &address, &[1]), cell(1, &active, &[1])])
            .is_none());
        assert!(materializer
            .materialize(&[cell(0, &address, &[0]), cell(1, &active, &[0])])
            .is_some());
    }

    #[test]
    fn test_omitted_field_contributes_nothing() {
        let doc = document();
        let spare = FieldSpec::omitted("SPARE").required();
        let name = FieldSpec::new("NAME", "name");

        let values = RowMaterializer::new(&doc)
            .materialize(&[cell(0, &spare, &[]), cell(1, &name, &[])])
            .unwrap();
        assert_eq!(values, vec!["N"]);
    }

    #[test]
    fn test_mapper_fans_out_values() {
        let doc = document();
        let name = FieldSpec::new("NAME", "name").map_with(|_field: &FieldSpec, value: Option<&str>| {
            let value = value.unwrap_or_default().to_string();
            vec![value.clone(), value]
        });
        let version = FieldSpec::new("VERSION", "version");

        let values = RowMaterializer::new(&doc)
            .materialize(&[cell(0, &name, &[]), cell(1, &version, &[])])
            .unwrap();
        assert_eq!(values, vec!["N", "N", ""]);
    }

    #[test]
    fn test_mapper_output_satisfies_required_field() {
        let doc = document();
        let fallback = FieldSpec::new("ACTIVE", "emails[*].active")
            .required()
            .map_with(|_field: &FieldSpec, value: Option<&str>| match value {
                Some(_) => Vec::new(),
                None => vec!["unknown".to_string()],
            });

        let materializer = RowMaterializer::new(&doc);
        assert_eq!(
            materializer.materialize(&[cell(0, &fallback, &[1])]).unwrap(),
            vec!["unknown"]
        );
        // An empty mapping falls back to the raw value
        assert_eq!(
            materializer.materialize(&[cell(0, &fallback, &[0])]).unwrap(),
            vec!["true"]
        );
    }
}
