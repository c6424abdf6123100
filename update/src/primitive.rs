//! Update primitives.
//!
//! A primitive describes one requested mutation of one node. Primitives of
//! the same kind on the same node are merged into a single one.

use std::fmt;

use pul_core::{Fragment, Pre, QName, SourceId};

use crate::{UpdateError, UpdateResult};

/// Kind of a node primitive.
///
/// The declaration order is the application order of primitives that share a
/// target and an effective location: value and name changes first, then
/// removals, then insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateKind {
    ReplaceValue,
    Rename,
    ReplaceElementContent,
    Delete,
    ReplaceNode,
    InsertBefore,
    InsertAfter,
    InsertInto,
    InsertIntoFirst,
    InsertAttribute,
}

impl UpdateKind {
    pub fn name(&self) -> &'static str {
        match self {
            UpdateKind::ReplaceValue => "replace-value",
            UpdateKind::Rename => "rename",
            UpdateKind::ReplaceElementContent => "replace-element-content",
            UpdateKind::Delete => "delete",
            UpdateKind::ReplaceNode => "replace-node",
            UpdateKind::InsertBefore => "insert-before",
            UpdateKind::InsertAfter => "insert-after",
            UpdateKind::InsertInto => "insert-into",
            UpdateKind::InsertIntoFirst => "insert-into-first",
            UpdateKind::InsertAttribute => "insert-attribute",
        }
    }

    /// Returns true for kinds that only add nodes.
    pub fn is_insert(&self) -> bool {
        matches!(
            self,
            UpdateKind::InsertBefore
                | UpdateKind::InsertAfter
                | UpdateKind::InsertInto
                | UpdateKind::InsertIntoFirst
                | UpdateKind::InsertAttribute
        )
    }

    /// Returns true for kinds that remove the target.
    pub fn destroys_target(&self) -> bool {
        matches!(self, UpdateKind::Delete | UpdateKind::ReplaceNode)
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node addressed by source and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target {
    pub source: SourceId,
    pub pre: Pre,
}

impl Target {
    pub fn new(source: SourceId, pre: Pre) -> Self {
        Self { source, pre }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.pre)
    }
}

/// The mutation requested by a primitive, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOp {
    InsertBefore(Fragment),
    InsertAfter(Fragment),
    /// Insert as last children. `substituted` marks the content created by a
    /// replace-element-content.
    InsertInto { content: Fragment, substituted: bool },
    InsertIntoFirst(Fragment),
    InsertAttribute(Fragment),
    /// Delete the target. `substituted` marks deletes created by a
    /// replace-element-content; such a delete overrides everything else
    /// requested for the node.
    Delete { substituted: bool },
    ReplaceNode(Fragment),
    ReplaceValue(String),
    ReplaceElementContent(String),
    Rename(QName),
}

impl NodeOp {
    pub fn kind(&self) -> UpdateKind {
        match self {
            NodeOp::InsertBefore(_) => UpdateKind::InsertBefore,
            NodeOp::InsertAfter(_) => UpdateKind::InsertAfter,
            NodeOp::InsertInto { .. } => UpdateKind::InsertInto,
            NodeOp::InsertIntoFirst(_) => UpdateKind::InsertIntoFirst,
            NodeOp::InsertAttribute(_) => UpdateKind::InsertAttribute,
            NodeOp::Delete { .. } => UpdateKind::Delete,
            NodeOp::ReplaceNode(_) => UpdateKind::ReplaceNode,
            NodeOp::ReplaceValue(_) => UpdateKind::ReplaceValue,
            NodeOp::ReplaceElementContent(_) => UpdateKind::ReplaceElementContent,
            NodeOp::Rename(_) => UpdateKind::Rename,
        }
    }

    /// Nodes added by the operation.
    pub fn content(&self) -> Option<&Fragment> {
        match self {
            NodeOp::InsertBefore(content)
            | NodeOp::InsertAfter(content)
            | NodeOp::InsertInto { content, .. }
            | NodeOp::InsertIntoFirst(content)
            | NodeOp::InsertAttribute(content)
            | NodeOp::ReplaceNode(content) => Some(content),
            _ => None,
        }
    }

    /// Returns true for deletes and inserts created by a replace-element-content.
    pub fn is_substitution(&self) -> bool {
        matches!(
            self,
            NodeOp::Delete { substituted: true } | NodeOp::InsertInto { substituted: true, .. }
        )
    }

    /// Fold another operation of the same kind into this one.
    pub fn merge(&mut self, other: NodeOp) -> UpdateResult<()> {
        match (self, other) {
            (NodeOp::InsertBefore(a), NodeOp::InsertBefore(b))
            | (NodeOp::InsertAfter(a), NodeOp::InsertAfter(b))
            | (NodeOp::InsertIntoFirst(a), NodeOp::InsertIntoFirst(b))
            | (NodeOp::InsertAttribute(a), NodeOp::InsertAttribute(b)) => a.append(b),
            (
                NodeOp::InsertInto {
                    content: a,
                    substituted: sa,
                },
                NodeOp::InsertInto {
                    content: b,
                    substituted: sb,
                },
            ) => {
                if sb && !*sa {
                    *a = b;
                    *sa = true;
                } else if *sa == sb {
                    a.append(b);
                }
            }
            (NodeOp::Delete { substituted: a }, NodeOp::Delete { substituted: b }) => *a |= b,
            (NodeOp::ReplaceNode(a), NodeOp::ReplaceNode(b)) => *a = b,
            (NodeOp::ReplaceValue(a), NodeOp::ReplaceValue(b))
            | (NodeOp::ReplaceElementContent(a), NodeOp::ReplaceElementContent(b)) => *a = b,
            (NodeOp::Rename(a), NodeOp::Rename(b)) => {
                if *a != b {
                    return Err(UpdateError::name_conflict(format!(
                        "node renamed to both {} and {}",
                        a, b
                    )));
                }
            }
            (current, other) => {
                return Err(UpdateError::invariant(format!(
                    "cannot merge {} into {}",
                    other.kind(),
                    current.kind()
                )))
            }
        }
        Ok(())
    }
}

/// A requested mutation of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub target: Target,
    pub op: NodeOp,
}

impl Primitive {
    pub fn new(target: Target, op: NodeOp) -> Self {
        Self { target, op }
    }

    pub fn insert_before(target: Target, content: Fragment) -> Self {
        Self::new(target, NodeOp::InsertBefore(content))
    }

    pub fn insert_after(target: Target, content: Fragment) -> Self {
        Self::new(target, NodeOp::InsertAfter(content))
    }

    /// Insert as last children; covers both `into` and `as last into`.
    pub fn insert_into(target: Target, content: Fragment) -> Self {
        Self::new(
            target,
            NodeOp::InsertInto {
                content,
                substituted: false,
            },
        )
    }

    pub fn insert_into_first(target: Target, content: Fragment) -> Self {
        Self::new(target, NodeOp::InsertIntoFirst(content))
    }

    pub fn insert_attributes(target: Target, attributes: Fragment) -> Self {
        Self::new(target, NodeOp::InsertAttribute(attributes))
    }

    pub fn delete(target: Target) -> Self {
        Self::new(target, NodeOp::Delete { substituted: false })
    }

    pub fn replace_node(target: Target, replacement: Fragment) -> Self {
        Self::new(target, NodeOp::ReplaceNode(replacement))
    }

    pub fn replace_value(target: Target, value: impl Into<String>) -> Self {
        Self::new(target, NodeOp::ReplaceValue(value.into()))
    }

    pub fn replace_element_content(target: Target, text: impl Into<String>) -> Self {
        Self::new(target, NodeOp::ReplaceElementContent(text.into()))
    }

    pub fn rename(target: Target, name: impl Into<QName>) -> Self {
        Self::new(target, NodeOp::Rename(name.into()))
    }

    pub fn kind(&self) -> UpdateKind {
        self.op.kind()
    }

    /// Fold another primitive on the same target into this one.
    pub fn merge(&mut self, other: Primitive) -> UpdateResult<()> {
        if self.target != other.target {
            return Err(UpdateError::invariant(format!(
                "cannot merge primitive on {} into primitive on {}",
                other.target, self.target
            )));
        }
        self.op.merge(other.op)
    }
}

/// Operation on a whole store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Optimize,
    Rename(String),
    Drop,
}

/// Serialize a node to an external location after the update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    pub target: Target,
    pub uri: String,
}

impl Put {
    pub fn new(target: Target, uri: impl Into<String>) -> Self {
        Self {
            target,
            uri: uri.into(),
        }
    }
}

/// Anything that can be added to a pending update list.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Node(Primitive),
    Put(Put),
    Store { source: SourceId, op: StoreOp },
}

impl Update {
    pub fn store(source: SourceId, op: StoreOp) -> Self {
        Update::Store { source, op }
    }

    /// Source addressed by the update.
    pub fn source(&self) -> SourceId {
        match self {
            Update::Node(primitive) => primitive.target.source,
            Update::Put(put) => put.target.source,
            Update::Store { source, .. } => *source,
        }
    }
}

impl From<Primitive> for Update {
    fn from(primitive: Primitive) -> Self {
        Update::Node(primitive)
    }
}

impl From<Put> for Update {
    fn from(put: Put) -> Self {
        Update::Put(put)
    }
}
