//! Rows of the pre-order document table.
//!
//! A document is encoded as a flat table in document order. Each row stores
//! the distance to its parent row and the size of its subtree, so the parent
//! of row `p` is `p - dist` and the following sibling starts at `p + size`.
//! Attributes are stored directly after their element, before its children.

use std::fmt;

use crate::QName;

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    /// Name of the kind for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }

    /// Returns true if nodes of this kind may have children.
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element)
    }

    /// Returns true if nodes of this kind carry a name.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the pre-order table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Kind of the node.
    pub kind: NodeKind,
    /// Distance to the parent row (0 for a root).
    pub dist: usize,
    /// Number of rows in the subtree, including this row and its attributes.
    pub size: usize,
    /// Name of elements, attributes and processing instructions.
    pub name: Option<QName>,
    /// String value of attributes, texts, comments and processing instructions.
    pub value: Option<String>,
}

impl Row {
    fn leaf(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Self {
            kind,
            dist: 0,
            size: 1,
            name,
            value,
        }
    }

    pub fn document() -> Self {
        Self::leaf(NodeKind::Document, None, None)
    }

    pub fn element(name: QName) -> Self {
        Self::leaf(NodeKind::Element, Some(name), None)
    }

    pub fn attribute(name: QName, value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Attribute, Some(name), Some(value.into()))
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text, None, Some(value.into()))
    }

    pub fn comment(value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Comment, None, Some(value.into()))
    }

    pub fn processing_instruction(target: QName, value: impl Into<String>) -> Self {
        Self::leaf(NodeKind::ProcessingInstruction, Some(target), Some(value.into()))
    }
}
