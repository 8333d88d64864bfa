//! Path tree construction
//!
//! Every field path is resolved against the document once, up front. Shared
//! prefixes collapse into a single node, and every array node remembers how
//! long each concrete instance of that array is, keyed by the indexes of the
//! enclosing arrays. Row enumeration then runs purely off this tree.

use crate::document::DocumentQuery;
use crate::error::{ConvertError, Result};
use crate::path;
use crate::types::{FieldPath, FieldSpec};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Index of a node in the tree arena
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Array,
    Property,
}

/// A node of the path tree
#[derive(Debug, Clone)]
pub struct PathNode {
    pub kind: NodeKind,

    /// Path with wildcards, e.g. `tenants[*].organizations` (`None` for the root)
    pub path: Option<String>,

    /// Children in first-discovery order
    pub children: Vec<NodeId>,

    /// Array length per instance, keyed by the indexes of the enclosing arrays
    pub array_sizes: HashMap<Vec<usize>, usize>,

    /// Fields (by declaration index) whose value lives at this leaf
    pub fields: Vec<usize>,
}

impl PathNode {
    fn new(kind: NodeKind, path: Option<String>) -> Self {
        PathNode {
            kind,
            path,
            children: Vec::new(),
            array_sizes: HashMap::new(),
            fields: Vec::new(),
        }
    }
}

/// Deduplicated tree of all field paths, stored as an arena
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<PathNode>,
    by_path: HashMap<String, NodeId>,
    omitted_fields: Vec<usize>,
    visit_order: Vec<Vec<NodeId>>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        PathTree {
            nodes: vec![PathNode::new(NodeKind::Root, None)],
            by_path: HashMap::new(),
            omitted_fields: Vec::new(),
            visit_order: Vec::new(),
        }
    }

    pub fn root(&self) -> &PathNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> &PathNode {
        &self.nodes[id]
    }

    /// Look up a node by its wildcard path
    pub fn find(&self, path: &str) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.omitted_fields.is_empty()
    }

    /// Fields with no source path; they belong to every row
    pub fn omitted_fields(&self) -> &[usize] {
        &self.omitted_fields
    }

    /// Recorded length of an array instance, if it was measured
    pub fn array_size(&self, id: NodeId, indexes: &[usize]) -> Option<usize> {
        self.nodes[id].array_sizes.get(indexes).copied()
    }

    /// Children of `id` in enumeration order: leaves first, then arrays,
    /// each group in discovery order
    pub fn visit_order(&self, id: NodeId) -> &[NodeId] {
        match self.visit_order.get(id) {
            Some(children) => children.as_slice(),
            None => &[],
        }
    }

    fn index_visit_order(&mut self) {
        self.visit_order = self
            .nodes
            .iter()
            .map(|node| {
                let (mut ordered, arrays): (Vec<NodeId>, Vec<NodeId>) = node
                    .children
                    .iter()
                    .copied()
                    .partition(|&child| self.nodes[child].kind == NodeKind::Property);
                ordered.extend(arrays);
                ordered
            })
            .collect();
    }

    /// Insert a node for `path`, or return the existing one.
    fn insert(&mut self, path: &str, kind: NodeKind) -> Result<NodeId> {
        if let Some(id) = self.find(path) {
            if self.nodes[id].kind != kind {
                return Err(ConvertError::ShapeConflict {
                    path: path.to_string(),
                });
            }
            return Ok(id);
        }

        let parent = self.attach_point(path);
        let id = self.nodes.len();
        self.nodes.push(PathNode::new(kind, Some(path.to_string())));
        self.nodes[parent].children.push(id);
        self.by_path.insert(path.to_string(), id);

        trace!("Added {:?} node {} under node {}", kind, path, parent);
        Ok(id)
    }

    /// Longest already-known structural prefix of `path`, or the root
    fn attach_point(&self, path: &str) -> NodeId {
        let mut current = path;
        while let Some(parent) = path::parent_path(current) {
            if let Some(id) = self.find(parent) {
                return id;
            }
            current = parent;
        }
        Self::ROOT
    }

    fn record_size(&mut self, id: NodeId, indexes: &[usize], size: usize) {
        self.nodes[id].array_sizes.insert(indexes.to_vec(), size);
    }

    fn bind_field(&mut self, id: NodeId, field_index: usize) {
        self.nodes[id].fields.push(field_index);
    }
}

/// Builds a `PathTree` for a list of fields against one document
pub struct PathTreeBuilder<'a, D: DocumentQuery + ?Sized> {
    document: &'a D,
    tree: PathTree,
}

impl<'a, D: DocumentQuery + ?Sized> PathTreeBuilder<'a, D> {
    pub fn new(document: &'a D) -> Self {
        PathTreeBuilder {
            document,
            tree: PathTree::new(),
        }
    }

    /// Resolve every field, in declaration order, into the tree
    pub fn build(mut self, fields: &[FieldSpec]) -> Result<PathTree> {
        for (index, field) in fields.iter().enumerate() {
            self.add_field(index, field)?;
        }
        self.tree.index_visit_order();

        debug!(
            "Built path tree with {} nodes for {} fields",
            self.tree.len(),
            fields.len()
        );
        Ok(self.tree)
    }

    fn add_field(&mut self, index: usize, field: &FieldSpec) -> Result<()> {
        let original = match &field.path {
            FieldPath::Real(path) => path.as_str(),
            FieldPath::Omitted => {
                self.tree.omitted_fields.push(index);
                return Ok(());
            }
        };

        check_field_path(field)?;

        // More than one leaf insertion can happen for a single field
        self.resolve(original, original, &mut Vec::new())?;

        let leaf = self
            .tree
            .find(original)
            .ok_or_else(|| ConvertError::ShapeConflict {
                path: original.to_string(),
            })?;
        self.tree.bind_field(leaf, index);
        Ok(())
    }

    /// Resolve the wildcards of `working` one at a time.
    ///
    /// `working` is `original` with the first `indexes.len()` wildcards
    /// replaced by the values in `indexes`. The array behind the next
    /// wildcard is measured and recorded under those indexes, then each of
    /// its elements is visited. Empty or missing arrays are still visited
    /// once so that their branch yields a row of empty values.
    fn resolve(&mut self, original: &str, working: &str, indexes: &mut Vec<usize>) -> Result<()> {
        if path::count_wildcards(working) == 0 {
            self.tree.insert(original, NodeKind::Property)?;
            return Ok(());
        }

        let array_path = path::array_prefix(working);
        let size = self.document.read_array_length(array_path).unwrap_or_else(|| {
            trace!("No array found at {}", array_path);
            0
        });

        let array_node = match path::wildcard_prefix(original, indexes.len()) {
            Some(prefix) => self.tree.insert(prefix, NodeKind::Array)?,
            None => {
                return Err(ConvertError::ShapeConflict {
                    path: original.to_string(),
                })
            }
        };
        self.tree.record_size(array_node, indexes, size);

        if size == 0 {
            trace!("Array {} is empty, visiting its items once", array_path);
        }
        for i in 0..size.max(1) {
            indexes.push(i);
            let next = path::fill_first_wildcard(working, i);
            self.resolve(original, &next, indexes)?;
            indexes.pop();
        }

        Ok(())
    }
}

/// Reject malformed field paths without reading any document
pub fn validate_field_paths(fields: &[FieldSpec]) -> Result<()> {
    fields.iter().try_for_each(check_field_path)
}

fn check_field_path(field: &FieldSpec) -> Result<()> {
    let FieldPath::Real(raw) = &field.path else {
        return Ok(());
    };

    path::parse_steps(raw)
        .map(|_| ())
        .map_err(|reason| ConvertError::MalformedPath {
            field: field.name.clone(),
            path: raw.clone(),
            reason,
        })
}

/// Build the path tree for `fields` against `document`
pub fn build_path_tree<D: DocumentQuery + ?Sized>(
    document: &D,
    fields: &[FieldSpec],
) -> Result<PathTree> {
    PathTreeBuilder::new(document).build(fields)
}
