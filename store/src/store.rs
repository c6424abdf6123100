//! The storage trait used by the update engine.
//!
//! All positions are pre values of the current table state. Mutating
//! operations return the signed change of the table length.

use std::fmt::Debug;

use pul_core::{Fragment, NodeId, NodeKind, Pre, QName, Row, StoreResult};

/// Counters of storage calls, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of mutating calls (insert, delete, replace, rename, update_value, optimize).
    pub writes: usize,
    /// Number of flushes.
    pub flushes: usize,
    /// Number of successful `start_write` calls.
    pub locks: usize,
}

impl StoreStats {
    /// Total number of calls that touch the store.
    pub fn total(&self) -> usize {
        self.writes + self.flushes + self.locks
    }
}

/// A position-addressed document table.
pub trait Store: Debug + Send {
    // ==================== Reading ====================

    /// Number of rows.
    fn len(&self) -> usize;

    /// Returns true if the table has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The row at a position.
    fn row(&self, pre: Pre) -> StoreResult<&Row>;

    /// Stable id of the node at a position.
    fn id(&self, pre: Pre) -> StoreResult<NodeId>;

    /// Current position of a node id, if the node still exists.
    fn pre_of_id(&self, id: NodeId) -> Option<Pre>;

    fn kind(&self, pre: Pre) -> StoreResult<NodeKind> {
        Ok(self.row(pre)?.kind)
    }

    /// Subtree size, including the node itself and its attributes.
    fn size(&self, pre: Pre) -> StoreResult<usize> {
        Ok(self.row(pre)?.size)
    }

    /// Parent position, `None` for a root.
    fn parent(&self, pre: Pre) -> StoreResult<Option<Pre>> {
        let row = self.row(pre)?;
        Ok((row.dist > 0).then(|| pre - row.dist))
    }

    /// Number of attributes of an element.
    fn attribute_count(&self, pre: Pre) -> StoreResult<usize> {
        let size = self.size(pre)?;
        let mut count = 0;
        while count + 1 < size && self.kind(pre + 1 + count)? == NodeKind::Attribute {
            count += 1;
        }
        Ok(count)
    }

    fn name(&self, pre: Pre) -> StoreResult<Option<&QName>> {
        Ok(self.row(pre)?.name.as_ref())
    }

    fn value(&self, pre: Pre) -> StoreResult<Option<&str>> {
        Ok(self.row(pre)?.value.as_deref())
    }

    /// Copy of the subtree rooted at a position.
    fn fragment(&self, pre: Pre) -> StoreResult<Fragment>;

    /// Positions of all top-level nodes.
    fn roots(&self) -> Vec<Pre> {
        let mut roots = Vec::new();
        let mut pre = 0;
        while let Ok(row) = self.row(pre) {
            roots.push(pre);
            pre += row.size.max(1);
        }
        roots
    }

    // ==================== Writing ====================

    /// Insert a node sequence at `pre` as children (or attributes) of `parent`.
    fn insert(&mut self, pre: Pre, parent: Pre, fragment: &Fragment) -> StoreResult<isize>;

    /// Delete the subtree at `pre`.
    fn delete(&mut self, pre: Pre) -> StoreResult<isize>;

    /// Replace the subtree at `pre` by a node sequence.
    fn replace(&mut self, pre: Pre, fragment: &Fragment) -> StoreResult<isize>;

    /// Rename an element, attribute or processing instruction.
    fn rename(&mut self, pre: Pre, name: QName) -> StoreResult<()>;

    /// Replace the string value of an attribute, text, comment or processing instruction.
    fn update_value(&mut self, pre: Pre, value: String) -> StoreResult<()>;

    /// Compact internal structures. Positions and ids stay valid.
    fn optimize(&mut self) -> StoreResult<()>;

    /// Persist pending changes.
    fn flush(&mut self) -> StoreResult<()>;

    /// Take the exclusive write lock.
    fn start_write(&mut self) -> StoreResult<()>;

    /// Release the write lock. Does nothing if it is not held.
    fn finish_write(&mut self);

    /// Location to export the table to on write-back.
    fn backing(&self) -> Option<&str>;

    /// Call counters.
    fn stats(&self) -> StoreStats;
}
