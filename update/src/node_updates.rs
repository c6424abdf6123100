//! All primitives that target one node.

use std::collections::BTreeMap;

use crate::{NodeOp, UpdateKind, UpdateResult};

/// Primitives on one node, at most one per kind.
///
/// Iteration yields the primitives in kind order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdates {
    ops: BTreeMap<UpdateKind, NodeOp>,
}

impl NodeUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation, merging it with an existing one of the same kind.
    pub fn add(&mut self, op: NodeOp) -> UpdateResult<()> {
        match self.ops.get_mut(&op.kind()) {
            Some(existing) => existing.merge(op),
            None => {
                self.ops.insert(op.kind(), op);
                Ok(())
            }
        }
    }

    pub fn get(&self, kind: UpdateKind) -> Option<&NodeOp> {
        self.ops.get(&kind)
    }

    pub fn contains(&self, kind: UpdateKind) -> bool {
        self.ops.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeOp> + '_ {
        self.ops.values()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns true if the node is deleted or replaced.
    pub fn destroys_target(&self) -> bool {
        self.ops.keys().any(UpdateKind::destroys_target)
    }

    /// Drop the primitives that are overridden by others on the same node.
    pub fn prepare(&mut self) {
        if matches!(
            self.ops.get(&UpdateKind::Delete),
            Some(NodeOp::Delete { substituted: true })
        ) {
            self.ops.retain(|kind, _| *kind == UpdateKind::Delete);
            return;
        }

        if self.ops.contains_key(&UpdateKind::ReplaceNode) {
            self.ops.retain(|kind, _| {
                matches!(
                    kind,
                    UpdateKind::ReplaceNode | UpdateKind::InsertBefore | UpdateKind::InsertAfter
                )
            });
        }

        if self.ops.remove(&UpdateKind::ReplaceElementContent).is_some() {
            self.ops.remove(&UpdateKind::InsertIntoFirst);
            if self
                .ops
                .get(&UpdateKind::InsertInto)
                .is_some_and(|op| !op.is_substitution())
            {
                self.ops.remove(&UpdateKind::InsertInto);
            }
        }
    }

    pub fn into_ops(self) -> impl Iterator<Item = NodeOp> {
        self.ops.into_values()
    }
}
