//! In-memory pre-order table.

use pul_core::{Fragment, NodeId, NodeKind, Pre, QName, Row, StoreError, StoreResult};

use crate::{xml, Store, StoreStats, WriteLock};

/// ID allocator for table rows.
#[derive(Debug)]
struct IdAllocator {
    next_id: u64,
}

impl IdAllocator {
    fn new() -> Self {
        Self { next_id: 1 }
    }

    fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// The in-memory document table.
#[derive(Debug)]
pub struct MemStore {
    /// Rows in document order
    rows: Vec<Row>,
    /// Stable id of each row, parallel to `rows`
    ids: Vec<NodeId>,
    /// ID allocator
    id_alloc: IdAllocator,
    /// Shared write lock
    lock: WriteLock,
    /// Whether this handle currently holds the lock
    holding: bool,
    /// Write-back location
    backing: Option<String>,
    /// Set by mutating calls, cleared by flush
    dirty: bool,
    stats: StoreStats,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            ids: Vec::new(),
            id_alloc: IdAllocator::new(),
            lock: WriteLock::new(),
            holding: false,
            backing: None,
            dirty: false,
            stats: StoreStats::default(),
        }
    }

    /// Create a table holding the nodes of a fragment as roots.
    pub fn from_fragment(fragment: Fragment) -> Self {
        let mut store = Self::new();
        let rows = fragment.into_rows();
        store.ids = rows.iter().map(|_| store.id_alloc.alloc()).collect();
        store.rows = rows;
        store
    }

    /// Parse an XML string into a table whose roots are the parsed top-level nodes.
    pub fn parse(input: &str) -> StoreResult<Self> {
        Ok(Self::from_fragment(xml::parse(input)?))
    }

    /// Set the write-back location.
    pub fn with_backing(mut self, location: impl Into<String>) -> Self {
        self.backing = Some(location.into());
        self
    }

    /// Use a shared write lock handle.
    pub fn with_lock(mut self, lock: WriteLock) -> Self {
        self.lock = lock;
        self
    }

    /// Handle to the write lock of this table.
    pub fn write_lock(&self) -> WriteLock {
        self.lock.clone()
    }

    /// Returns true if there are unflushed changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Serialize the whole table.
    pub fn to_xml(&self) -> StoreResult<String> {
        xml::serialize_all(self)
    }

    // ==================== Internals ====================

    fn check(&self, pre: Pre) -> StoreResult<()> {
        if pre < self.rows.len() {
            Ok(())
        } else {
            Err(StoreError::out_of_range(pre, self.rows.len()))
        }
    }

    fn ancestors(&self, pre: Pre) -> Vec<Pre> {
        let mut ancestors = Vec::new();
        let mut current = pre;
        while let Some(row) = self.rows.get(current) {
            if row.dist == 0 {
                break;
            }
            current -= row.dist;
            ancestors.push(current);
        }
        ancestors
    }

    fn touch(&mut self) {
        self.stats.writes += 1;
        self.dirty = true;
    }

    /// Insert rows at `pre` below an optional parent.
    fn splice_in(&mut self, pre: Pre, parent: Option<Pre>, fragment: &Fragment) -> usize {
        let n = fragment.len();
        if n == 0 {
            return 0;
        }

        // Following rows whose parent lies before the insertion point move away from it
        for (i, row) in self.rows.iter_mut().enumerate().skip(pre) {
            if row.dist > 0 && i - row.dist < pre {
                row.dist += n;
            }
        }

        if let Some(parent) = parent {
            self.rows[parent].size += n;
            for ancestor in self.ancestors(parent) {
                self.rows[ancestor].size += n;
            }
        }

        let mut rows = fragment.rows().to_vec();
        for offset in fragment.roots() {
            rows[offset].dist = parent.map_or(0, |p| pre + offset - p);
        }
        let ids: Vec<NodeId> = (0..n).map(|_| self.id_alloc.alloc()).collect();
        self.rows.splice(pre..pre, rows);
        self.ids.splice(pre..pre, ids);
        n
    }

    /// Remove the subtree at `pre`.
    fn splice_out(&mut self, pre: Pre) -> usize {
        let size = self.rows[pre].size;
        for ancestor in self.ancestors(pre) {
            self.rows[ancestor].size -= size;
        }
        for (i, row) in self.rows.iter_mut().enumerate().skip(pre + size) {
            if row.dist > 0 && i - row.dist < pre {
                row.dist -= size;
            }
        }
        self.rows.drain(pre..pre + size);
        self.ids.drain(pre..pre + size);
        size
    }
}

impl Store for MemStore {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, pre: Pre) -> StoreResult<&Row> {
        self.rows
            .get(pre)
            .ok_or_else(|| StoreError::out_of_range(pre, self.rows.len()))
    }

    fn id(&self, pre: Pre) -> StoreResult<NodeId> {
        self.ids
            .get(pre)
            .copied()
            .ok_or_else(|| StoreError::out_of_range(pre, self.rows.len()))
    }

    fn pre_of_id(&self, id: NodeId) -> Option<Pre> {
        self.ids.iter().position(|&i| i == id)
    }

    fn fragment(&self, pre: Pre) -> StoreResult<Fragment> {
        let size = self.size(pre)?;
        let mut rows = self.rows[pre..pre + size].to_vec();
        rows[0].dist = 0;
        Ok(Fragment::from_rows(rows))
    }

    fn insert(&mut self, pre: Pre, parent: Pre, fragment: &Fragment) -> StoreResult<isize> {
        let parent_row = self.row(parent)?;
        if !parent_row.kind.is_container() {
            return Err(StoreError::invalid_kind(
                parent,
                parent_row.kind.name(),
                "cannot have children",
            ));
        }
        if pre <= parent || pre > parent + parent_row.size {
            return Err(StoreError::out_of_range(pre, self.rows.len()));
        }
        self.touch();
        Ok(self.splice_in(pre, Some(parent), fragment) as isize)
    }

    fn delete(&mut self, pre: Pre) -> StoreResult<isize> {
        self.check(pre)?;
        self.touch();
        Ok(-(self.splice_out(pre) as isize))
    }

    fn replace(&mut self, pre: Pre, fragment: &Fragment) -> StoreResult<isize> {
        let parent = self.parent(pre)?;
        self.touch();
        let removed = self.splice_out(pre);
        let added = self.splice_in(pre, parent, fragment);
        Ok(added as isize - removed as isize)
    }

    fn rename(&mut self, pre: Pre, name: QName) -> StoreResult<()> {
        let kind = self.kind(pre)?;
        if !kind.is_named() {
            return Err(StoreError::invalid_kind(pre, kind.name(), "node has no name"));
        }
        self.touch();
        self.rows[pre].name = Some(name);
        Ok(())
    }

    fn update_value(&mut self, pre: Pre, value: String) -> StoreResult<()> {
        let kind = self.kind(pre)?;
        if kind.is_container() {
            return Err(StoreError::invalid_kind(pre, kind.name(), "node has no value"));
        }
        self.touch();
        self.rows[pre].value = Some(value);
        Ok(())
    }

    fn optimize(&mut self) -> StoreResult<()> {
        self.touch();
        self.rows.shrink_to_fit();
        self.ids.shrink_to_fit();
        Ok(())
    }

    fn flush(&mut self) -> StoreResult<()> {
        self.stats.flushes += 1;
        self.dirty = false;
        Ok(())
    }

    fn start_write(&mut self) -> StoreResult<()> {
        if self.holding {
            return Ok(());
        }
        if !self.lock.try_acquire() {
            return Err(StoreError::locked("write lock held by another snapshot"));
        }
        self.holding = true;
        self.stats.locks += 1;
        Ok(())
    }

    fn finish_write(&mut self) {
        if self.holding {
            self.lock.release();
            self.holding = false;
        }
    }

    fn backing(&self) -> Option<&str> {
        self.backing.as_deref()
    }

    fn stats(&self) -> StoreStats {
        self.stats
    }
}
