//! Fragments: node sequences carried by insert and replace updates.
//!
//! A fragment uses the same row encoding as a store. Every top-level node of
//! the sequence is a root with `dist == 0`; roots follow each other in order.

use crate::{NodeKind, QName, Row};

/// A sequence of subtrees in pre-order encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    rows: Vec<Row>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment from already encoded rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Create a fragment from node builders.
    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeBuilder>) -> Self {
        let mut fragment = Self::new();
        for node in nodes {
            fragment.push(node);
        }
        fragment
    }

    /// Create a fragment holding a single text node.
    pub fn text(value: impl Into<String>) -> Self {
        Self::from_rows(vec![Row::text(value)])
    }

    /// Append a node to the sequence.
    pub fn push(&mut self, node: NodeBuilder) {
        node.flatten_into(&mut self.rows, None);
    }

    /// Append all nodes of another fragment.
    pub fn append(&mut self, other: Fragment) {
        self.rows.extend(other.rows);
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the fragment, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Offsets of the top-level nodes.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        let mut next = 0;
        std::iter::from_fn(move || {
            let row = self.rows.get(next)?;
            let current = next;
            next += row.size.max(1);
            Some(current)
        })
    }

    /// Top-level rows.
    pub fn root_rows(&self) -> impl Iterator<Item = &Row> + '_ {
        self.roots().map(move |i| &self.rows[i])
    }

    /// Returns true if the sequence consists of attributes only.
    pub fn is_attributes(&self) -> bool {
        !self.is_empty() && self.root_rows().all(|r| r.kind == NodeKind::Attribute)
    }

    /// Names of the top-level attributes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &QName> + '_ {
        self.root_rows()
            .filter(|r| r.kind == NodeKind::Attribute)
            .filter_map(|r| r.name.as_ref())
    }

    /// Names of all elements and attributes in the fragment.
    pub fn names(&self) -> impl Iterator<Item = (&QName, bool)> + '_ {
        self.rows.iter().filter_map(|r| match r.kind {
            NodeKind::Element => r.name.as_ref().map(|n| (n, false)),
            NodeKind::Attribute => r.name.as_ref().map(|n| (n, true)),
            _ => None,
        })
    }

    /// Copy of the subtree rooted at the given offset.
    pub fn subtree(&self, offset: usize) -> Fragment {
        let Some(root) = self.rows.get(offset) else {
            return Fragment::new();
        };
        let end = (offset + root.size).min(self.rows.len());
        let mut rows = self.rows[offset..end].to_vec();
        if let Some(root) = rows.first_mut() {
            root.dist = 0;
        }
        Fragment { rows }
    }

    /// Concatenated string value of all text rows.
    pub fn string_value(&self) -> String {
        self.rows
            .iter()
            .filter(|r| matches!(r.kind, NodeKind::Text))
            .filter_map(|r| r.value.as_deref())
            .collect()
    }
}

/// Builder for one node of a fragment.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    row: Row,
    attributes: Vec<Row>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    fn new(row: Row) -> Self {
        Self {
            row,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute (elements only).
    pub fn attr(mut self, name: impl Into<QName>, value: impl Into<String>) -> Self {
        self.attributes.push(Row::attribute(name.into(), value));
        self
    }

    /// Add a child node.
    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child);
        self
    }

    /// Finish into a single-node fragment.
    pub fn build(self) -> Fragment {
        Fragment::from_nodes([self])
    }

    fn flatten_into(self, rows: &mut Vec<Row>, parent: Option<usize>) {
        let pre = rows.len();
        let mut row = self.row;
        row.dist = parent.map_or(0, |p| pre - p);
        rows.push(row);
        for mut attr in self.attributes {
            attr.dist = rows.len() - pre;
            attr.size = 1;
            rows.push(attr);
        }
        for child in self.children {
            child.flatten_into(rows, Some(pre));
        }
        rows[pre].size = rows.len() - pre;
    }
}

/// Document node builder.
pub fn doc() -> NodeBuilder {
    NodeBuilder::new(Row::document())
}

/// Element builder.
pub fn elem(name: impl Into<QName>) -> NodeBuilder {
    NodeBuilder::new(Row::element(name.into()))
}

/// Standalone attribute builder.
pub fn attr(name: impl Into<QName>, value: impl Into<String>) -> NodeBuilder {
    NodeBuilder::new(Row::attribute(name.into(), value))
}

/// Text node builder.
pub fn text(value: impl Into<String>) -> NodeBuilder {
    NodeBuilder::new(Row::text(value))
}

/// Comment builder.
pub fn comment(value: impl Into<String>) -> NodeBuilder {
    NodeBuilder::new(Row::comment(value))
}

/// Processing instruction builder.
pub fn pi(target: impl Into<QName>, value: impl Into<String>) -> NodeBuilder {
    NodeBuilder::new(Row::processing_instruction(target.into(), value))
}
