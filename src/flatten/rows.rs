//! Row enumeration over a path tree
//!
//! Walks the tree depth first and expands every array into one branch per
//! element. Cells for leaves outside any array are added to the row before it
//! is forked, so they are shared by every branch below; cells inside an
//! array are added to that branch's private copy. A row is complete when it
//! holds one cell per field.

use crate::error::Result;
use crate::flatten::plan::{NodeId, NodeKind, PathTree};
use crate::path;
use crate::types::{FieldPath, FieldSpec};
use tracing::trace;

/// Where one cell of a row takes its value from
#[derive(Debug, Clone)]
pub struct CellDescriptor<'a> {
    /// Declaration index of the field
    pub field_index: usize,

    pub field: &'a FieldSpec,

    /// One concrete index per wildcard of the field path, left to right
    pub indexes: Vec<usize>,
}

impl<'a> CellDescriptor<'a> {
    pub fn path(&self) -> &'a FieldPath {
        &self.field.path
    }

    /// Field path with its wildcards replaced by `indexes`, if it has a path
    pub fn concrete_path(&self) -> Option<String> {
        self.field
            .path
            .as_str()
            .map(|raw| path::fill_wildcards(raw, &self.indexes))
    }
}

/// Enumerates the complete rows described by a path tree
pub struct RowEnumerator<'a> {
    tree: &'a PathTree,
    fields: &'a [FieldSpec],
}

impl<'a> RowEnumerator<'a> {
    pub fn new(tree: &'a PathTree, fields: &'a [FieldSpec]) -> Self {
        RowEnumerator { tree, fields }
    }

    /// Call `on_row` once per complete row, cells in field declaration order.
    ///
    /// Returns the number of complete rows found. Stops at the first error
    /// returned by `on_row`.
    pub fn for_each_row<F>(&self, mut on_row: F) -> Result<usize>
    where
        F: FnMut(&[CellDescriptor<'a>]) -> Result<()>,
    {
        if self.fields.is_empty() {
            return Ok(0);
        }

        let mut completed = 0;
        let mut row: Vec<CellDescriptor<'a>> = self
            .tree
            .omitted_fields()
            .iter()
            .map(|&field_index| self.cell(field_index, &[]))
            .collect();

        if row.len() == self.fields.len() {
            self.emit(&row, &mut on_row)?;
            return Ok(1);
        }

        self.visit(PathTree::ROOT, &mut row, &[], &mut on_row, &mut completed)?;
        Ok(completed)
    }

    fn visit<F>(
        &self,
        id: NodeId,
        row: &mut Vec<CellDescriptor<'a>>,
        indexes: &[usize],
        on_row: &mut F,
        completed: &mut usize,
    ) -> Result<()>
    where
        F: FnMut(&[CellDescriptor<'a>]) -> Result<()>,
    {
        let node = self.tree.node(id);

        match node.kind {
            NodeKind::Property => {
                for &field_index in &node.fields {
                    row.push(self.cell(field_index, indexes));
                }
                if row.len() == self.fields.len() {
                    trace!("Row complete at indexes {:?}", indexes);
                    self.emit(row, on_row)?;
                    *completed += 1;
                }
            }
            NodeKind::Array => {
                let size = self.tree.array_size(id, indexes).unwrap_or(0).max(1);
                for i in 0..size {
                    let mut branch_indexes = Vec::with_capacity(indexes.len() + 1);
                    branch_indexes.extend_from_slice(indexes);
                    branch_indexes.push(i);

                    // The parent's row stays untouched for the next element
                    let mut branch_row = row.clone();
                    for &child in self.tree.visit_order(id) {
                        self.visit(child, &mut branch_row, &branch_indexes, on_row, completed)?;
                    }
                }
            }
            NodeKind::Root => {
                for &child in self.tree.visit_order(id) {
                    self.visit(child, row, indexes, on_row, completed)?;
                }
            }
        }

        Ok(())
    }

    fn cell(&self, field_index: usize, indexes: &[usize]) -> CellDescriptor<'a> {
        CellDescriptor {
            field_index,
            field: &self.fields[field_index],
            indexes: indexes.to_vec(),
        }
    }

    fn emit<F>(&self, row: &[CellDescriptor<'a>], on_row: &mut F) -> Result<()>
    where
        F: FnMut(&[CellDescriptor<'a>]) -> Result<()>,
    {
        let mut ordered = row.to_vec();
        ordered.sort_by_key(|cell| cell.field_index);
        on_row(&ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::JsonDocument;
    use crate::flatten::plan::build_path_tree;
    use serde_json::{json, Value};

    /// Concrete paths of every complete row
    fn enumerate(document: Value, fields: &[FieldSpec]) -> Vec<Vec<String>> {
        let document = JsonDocument::new(document);
        let tree = build_path_tree(&document, fields).unwrap();
        let mut rows: Vec<Vec<String>> = Vec::new();

        let count = RowEnumerator::new(&tree, fields)
            .for_each_row(|row| {
                rows.push(
                    row.iter()
                        .map(|cell| cell.concrete_path().unwrap_or_default())
                        .collect(),
                );
                Ok(())
            })
            .unwrap();

        assert_eq!(count, rows.len());
        rows
    }

    #[test]
    fn test_no_arrays_yield_one_row() {
        let rows = enumerate(
            json!({"name": "N"}),
            &[
                FieldSpec::new("NAME", "name"),
                FieldSpec::new("VERSION", "version"),
            ],
        );
        assert_eq!(rows, vec![vec!["name", "version"]]);
    }

    #[test]
    fn test_nested_arrays_expand_per_element() {
        let rows = enumerate(
            json!({
                "tenants": [
                    {"organizations": [{}, {}]},
                    {"organizations": []},
                    {"organizations": [{}]}
                ]
            }),
            &[
                FieldSpec::new("NAME", "name"),
                FieldSpec::new("TENANT", "tenants[*].id"),
                FieldSpec::new("ORG", "tenants[*].organizations[*].id"),
            ],
        );

        assert_eq!(
            rows,
            vec![
                vec!["name", "tenants[0].id", "tenants[0].organizations[0].id"],
                vec!["name", "tenants[0].id", "tenants[0].organizations[1].id"],
                vec!["name", "tenants[1].id", "tenants[1].organizations[0].id"],
                vec!["name", "tenants[2].id", "tenants[2].organizations[0].id"],
            ]
        );
    }

    #[test]
    fn test_cells_follow_declaration_order() {
        let rows = enumerate(
            json!({"emails": ["a", "b"], "name": "N"}),
            &[
                FieldSpec::new("EMAIL", "emails[*]"),
                FieldSpec::new("NAME", "name"),
            ],
        );
        assert_eq!(
            rows,
            vec![vec!["emails[0]", "name"], vec!["emails[1]", "name"]]
        );
    }

    #[test]
    fn test_sibling_arrays_never_complete_a_row() {
        let rows = enumerate(
            json!({
                "contacts": {
                    "emails": [{"address": "a@x"}, {"address": "b@x"}],
                    "phones": ["123"]
                }
            }),
            &[
                FieldSpec::new("NAME", "name"),
                FieldSpec::new("EMAIL", "contacts.emails[*].address"),
                FieldSpec::new("PHONE", "contacts.phones[*]"),
            ],
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_duplicate_paths_and_omitted_fields_fill_their_columns() {
        let fields = vec![
            FieldSpec::omitted("SPARE"),
            FieldSpec::new("A", "items[*].id"),
            FieldSpec::new("B", "items[*].id"),
        ];
        let document = JsonDocument::new(json!({"items": [{"id": 1}]}));
        let tree = build_path_tree(&document, &fields).unwrap();

        let mut seen = Vec::new();
        RowEnumerator::new(&tree, &fields)
            .for_each_row(|row| {
                seen.push(
                    row.iter()
                        .map(|cell| (cell.field_index, cell.indexes.clone()))
                        .collect::<Vec<_>>(),
                );
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, vec![vec![(0, vec![]), (1, vec![0]), (2, vec![0])]]);
    }

    #[test]
    fn test_only_omitted_fields_yield_one_row() {
        let rows = enumerate(json!({}), &[FieldSpec::omitted("SPARE")]);
        assert_eq!(rows, vec![vec![""]]);
    }

    #[test]
    fn test_no_fields_yield_no_rows() {
        assert!(enumerate(json!({"name": "N"}), &[]).is_empty());
    }
}
