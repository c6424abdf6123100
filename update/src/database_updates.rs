//! Pending updates of one source.
//!
//! A ledger owns the buckets of all targeted nodes, the whole-store
//! operations and the puts of one source. `check` validates the collected
//! primitives without touching the store and fixes their application order;
//! the apply functions then run that order.

use std::collections::{BTreeMap, BTreeSet};

use pul_core::{Fragment, NodeId, NodeKind, Pre, SourceId};
use pul_export::Sink;
use pul_store::{is_valid_source_name, xml, Catalog, Store};

use crate::apply::{apply_scheduled, storage, NodeStats, Scheduled};
use crate::{
    sort_descending, NamePool, NodeOp, NodeUpdates, Primitive, Put, StoreOp,
    UpdateError, UpdateKind, UpdateOptions, UpdateResult,
};

/// Positions of the children of a node, attributes excluded.
pub(crate) fn children(store: &dyn Store, pre: Pre) -> UpdateResult<Vec<Pre>> {
    let end = pre + store.size(pre)?;
    let mut child = pre + 1 + store.attribute_count(pre)?;
    let mut children = Vec::new();
    while child < end {
        children.push(child);
        child += store.size(child)?;
    }
    Ok(children)
}

fn has_attribute_roots(fragment: &Fragment) -> bool {
    fragment.root_rows().any(|row| row.kind == NodeKind::Attribute)
}

/// Puts on one node.
#[derive(Debug, Clone)]
struct PendingPut {
    node: NodeId,
    uris: Vec<String>,
}

/// Whole-store operations, at most one of each type.
#[derive(Debug, Clone, Default)]
struct StoreOps {
    optimize: bool,
    rename: Option<String>,
    drop: bool,
}

impl StoreOps {
    fn len(&self) -> usize {
        usize::from(self.optimize) + usize::from(self.rename.is_some()) + usize::from(self.drop)
    }
}

/// All pending updates of one source.
#[derive(Debug, Clone)]
pub struct DatabaseUpdates {
    source: SourceId,
    /// Buckets by target position
    buckets: BTreeMap<Pre, NodeUpdates>,
    store_ops: StoreOps,
    /// Puts by stable node id
    puts: BTreeMap<NodeId, PendingPut>,
    /// Node primitives in application order, filled by `check`
    scheduled: Vec<Scheduled>,
}

impl DatabaseUpdates {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            buckets: BTreeMap::new(),
            store_ops: StoreOps::default(),
            puts: BTreeMap::new(),
            scheduled: Vec::new(),
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Number of pending primitives after merging.
    pub fn pending_count(&self) -> usize {
        let nodes = if self.scheduled.is_empty() {
            self.buckets.values().map(NodeUpdates::len).sum()
        } else {
            self.scheduled.len()
        };
        let puts: usize = self.puts.values().map(|p| p.uris.len()).sum();
        nodes + puts + self.store_ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// Bucket of a target position.
    pub fn bucket(&self, pre: Pre) -> Option<&NodeUpdates> {
        self.buckets.get(&pre)
    }

    /// New name of the store, if it is renamed.
    pub fn renamed_to(&self) -> Option<&str> {
        self.store_ops.rename.as_deref()
    }

    /// Returns true if the store is dropped.
    pub fn drops_store(&self) -> bool {
        self.store_ops.drop
    }

    /// All put locations.
    pub fn put_uris(&self) -> impl Iterator<Item = &str> + '_ {
        self.puts.values().flat_map(|p| p.uris.iter().map(String::as_str))
    }

    /// Returns true if node primitives are scheduled.
    pub fn edits_nodes(&self) -> bool {
        !self.scheduled.is_empty()
    }

    // ==================== Collecting ====================

    /// Add a node primitive after validating its target.
    pub fn add(&mut self, primitive: Primitive, store: &dyn Store) -> UpdateResult<()> {
        if !Self::validate(&primitive, store)? {
            tracing::debug!(node = %primitive.target, kind = %primitive.kind(), "ignored primitive on root");
            return Ok(());
        }
        tracing::debug!(node = %primitive.target, kind = %primitive.kind(), "added primitive");
        self.buckets
            .entry(primitive.target.pre)
            .or_default()
            .add(primitive.op)
    }

    /// Check that a primitive fits its target. Returns false if it has no effect.
    fn validate(primitive: &Primitive, store: &dyn Store) -> UpdateResult<bool> {
        let pre = primitive.target.pre;
        let kind = store.kind(pre)?;
        let has_parent = store.parent(pre)?.is_some();
        let invalid = |message: &str| {
            Err(UpdateError::invalid_target(format!(
                "{} on {} node {}: {}",
                primitive.kind(),
                kind,
                primitive.target,
                message
            )))
        };

        match &primitive.op {
            NodeOp::InsertBefore(content) | NodeOp::InsertAfter(content) => {
                if kind == NodeKind::Attribute || !has_parent {
                    return invalid("target has no siblings");
                }
                if has_attribute_roots(content) {
                    return invalid("attributes cannot be inserted as siblings");
                }
            }
            NodeOp::InsertInto { content, .. } | NodeOp::InsertIntoFirst(content) => {
                if !kind.is_container() {
                    return invalid("target cannot have children");
                }
                if has_attribute_roots(content) {
                    return invalid("attributes must be inserted as attributes");
                }
            }
            NodeOp::InsertAttribute(content) => {
                if kind != NodeKind::Element {
                    return invalid("only elements have attributes");
                }
                if !content.is_attributes() {
                    return invalid("content is not a sequence of attributes");
                }
            }
            NodeOp::Delete { .. } => {
                if !has_parent {
                    return Ok(false);
                }
            }
            NodeOp::ReplaceNode(content) => {
                if !has_parent {
                    return invalid("target has no parent");
                }
                let attributes = content.is_empty() || content.is_attributes();
                if kind == NodeKind::Attribute && !attributes {
                    return invalid("an attribute can only be replaced by attributes");
                }
                if kind != NodeKind::Attribute && has_attribute_roots(content) {
                    return invalid("attributes cannot replace a child node");
                }
            }
            NodeOp::ReplaceValue(_) => {
                if kind.is_container() {
                    return invalid("node has no value");
                }
            }
            NodeOp::ReplaceElementContent(_) => {
                if kind != NodeKind::Element {
                    return invalid("target is not an element");
                }
            }
            NodeOp::Rename(_) => {
                if !kind.is_named() {
                    return invalid("node has no name");
                }
            }
        }
        Ok(true)
    }

    /// Add a put. Puts on the same node are merged.
    pub fn add_put(&mut self, put: Put, store: &dyn Store) -> UpdateResult<()> {
        let kind = store.kind(put.target.pre)?;
        if !matches!(kind, NodeKind::Document | NodeKind::Element) {
            return Err(UpdateError::invalid_target(format!(
                "put of {} node {}",
                kind, put.target
            )));
        }
        let node = store.id(put.target.pre)?;
        tracing::debug!(node = %put.target, uri = %put.uri, "added put");
        self.puts
            .entry(node)
            .or_insert_with(|| PendingPut {
                node,
                uris: Vec::new(),
            })
            .uris
            .push(put.uri);
        Ok(())
    }

    /// Add a whole-store operation.
    pub fn add_store_op(&mut self, op: StoreOp) -> UpdateResult<()> {
        match op {
            StoreOp::Optimize => self.store_ops.optimize = true,
            StoreOp::Drop => self.store_ops.drop = true,
            StoreOp::Rename(name) => match &self.store_ops.rename {
                Some(existing) if *existing != name => {
                    return Err(UpdateError::name_conflict(format!(
                        "source {} renamed to both {} and {}",
                        self.source, existing, name
                    )));
                }
                _ => self.store_ops.rename = Some(name),
            },
        }
        Ok(())
    }

    // ==================== Check ====================

    /// Validate all pending updates and fix the application order.
    ///
    /// The store is only read.
    pub fn check(&mut self, catalog: &Catalog, options: &UpdateOptions) -> UpdateResult<()> {
        let store = catalog.get(self.source)?;

        self.expand_element_content(store)?;
        for bucket in self.buckets.values_mut() {
            bucket.prepare();
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());

        self.check_puts(store)?;
        self.discard_destroyed(store)?;
        self.check_names(store, options)?;
        self.check_store_ops(catalog)?;
        self.schedule(store)
    }

    /// Turn every replace-element-content into deletes of the children and
    /// an insert of the new text.
    fn expand_element_content(&mut self, store: &dyn Store) -> UpdateResult<()> {
        let targets: Vec<(Pre, String)> = self
            .buckets
            .iter()
            .filter_map(|(&pre, bucket)| match bucket.get(UpdateKind::ReplaceElementContent) {
                Some(NodeOp::ReplaceElementContent(text)) => Some((pre, text.clone())),
                _ => None,
            })
            .collect();

        for (pre, text) in targets {
            for child in children(store, pre)? {
                self.buckets
                    .entry(child)
                    .or_default()
                    .add(NodeOp::Delete { substituted: true })?;
            }
            if !text.is_empty() {
                self.buckets.entry(pre).or_default().add(NodeOp::InsertInto {
                    content: Fragment::text(text),
                    substituted: true,
                })?;
            }
        }
        Ok(())
    }

    /// A put target must survive the update.
    fn check_puts(&self, store: &dyn Store) -> UpdateResult<()> {
        if self.puts.is_empty() {
            return Ok(());
        }
        if self.store_ops.drop {
            return Err(UpdateError::dangling_target(format!(
                "put on source {} which is dropped",
                self.source
            )));
        }
        for put in self.puts.values() {
            let pre = store.pre_of_id(put.node).ok_or_else(|| {
                UpdateError::dangling_target(format!("put target {} no longer exists", put.node))
            })?;
            let mut current = Some(pre);
            while let Some(node) = current {
                if self.buckets.get(&node).is_some_and(NodeUpdates::destroys_target) {
                    return Err(UpdateError::dangling_target(format!(
                        "put target {} is removed by the update",
                        put.node
                    )));
                }
                current = store.parent(node)?;
            }
        }
        Ok(())
    }

    /// Drop buckets of nodes inside subtrees that are deleted or replaced.
    fn discard_destroyed(&mut self, store: &dyn Store) -> UpdateResult<()> {
        let mut covered_until = 0;
        let mut discarded = Vec::new();
        for (&pre, bucket) in &self.buckets {
            if pre < covered_until {
                discarded.push(pre);
            } else if bucket.destroys_target() {
                covered_until = pre + store.size(pre)?;
            }
        }
        for pre in discarded {
            self.buckets.remove(&pre);
        }
        Ok(())
    }

    /// Elements whose set of attribute names may change.
    fn affected_elements(&self, store: &dyn Store) -> UpdateResult<BTreeSet<Pre>> {
        let mut elements = BTreeSet::new();
        for (&pre, bucket) in &self.buckets {
            match store.kind(pre)? {
                NodeKind::Element
                    if bucket.contains(UpdateKind::InsertAttribute)
                        || bucket.contains(UpdateKind::Rename) =>
                {
                    elements.insert(pre);
                }
                NodeKind::Attribute
                    if bucket.contains(UpdateKind::Rename)
                        || bucket.contains(UpdateKind::ReplaceNode) =>
                {
                    if let Some(parent) = store.parent(pre)? {
                        elements.insert(parent);
                    }
                }
                _ => {}
            }
        }
        Ok(elements)
    }

    fn check_names(&self, store: &dyn Store, options: &UpdateOptions) -> UpdateResult<()> {
        for element in self.affected_elements(store)? {
            let pool = self.name_pool(store, element)?;
            if let Some(name) = pool.duplicate() {
                tracing::warn!(source = %self.source, element, name = %name, "duplicate attribute");
                return Err(UpdateError::duplicate_attribute(name.lexical()));
            }
            if options.check_namespaces {
                pool.namespace_ok().map_err(|clash| {
                    UpdateError::namespace_conflict(clash.prefix, clash.first, clash.second)
                })?;
            }
        }
        Ok(())
    }

    /// Names an element and its attributes will carry after the update.
    fn name_pool(&self, store: &dyn Store, element: Pre) -> UpdateResult<NamePool> {
        let mut pool = NamePool::new();
        let bucket = self.buckets.get(&element);

        if let Some(name) = store.name(element)? {
            pool.add(name, false);
            if let Some(NodeOp::Rename(new)) = bucket.and_then(|b| b.get(UpdateKind::Rename)) {
                pool.remove(name, false);
                pool.add(new, false);
            }
        }
        if let Some(NodeOp::InsertAttribute(content)) =
            bucket.and_then(|b| b.get(UpdateKind::InsertAttribute))
        {
            for name in content.attribute_names() {
                pool.add(name, true);
            }
        }

        let attributes = store.attribute_count(element)?;
        for attribute in element + 1..element + 1 + attributes {
            let Some(name) = store.name(attribute)? else {
                continue;
            };
            pool.add(name, true);
            let Some(bucket) = self.buckets.get(&attribute) else {
                continue;
            };
            if bucket.destroys_target() {
                pool.remove(name, true);
            } else if let Some(NodeOp::Rename(new)) = bucket.get(UpdateKind::Rename) {
                pool.remove(name, true);
                pool.add(new, true);
            }
            if let Some(NodeOp::ReplaceNode(content)) = bucket.get(UpdateKind::ReplaceNode) {
                for name in content.attribute_names() {
                    pool.add(name, true);
                }
            }
        }
        Ok(pool)
    }

    fn check_store_ops(&self, catalog: &Catalog) -> UpdateResult<()> {
        let Some(name) = &self.store_ops.rename else {
            return Ok(());
        };
        if !is_valid_source_name(name) {
            return Err(UpdateError::invalid_target(format!("invalid source name: {}", name)));
        }
        if catalog.find(name).is_some_and(|other| other != self.source) {
            return Err(UpdateError::name_conflict(format!("source {} already exists", name)));
        }
        Ok(())
    }

    /// Resolve effective locations and sort into application order.
    fn schedule(&mut self, store: &dyn Store) -> UpdateResult<()> {
        let mut scheduled = Vec::new();
        for (pre, bucket) in std::mem::take(&mut self.buckets) {
            for op in bucket.into_ops() {
                scheduled.push(Scheduled::resolve(store, pre, op)?);
            }
        }
        sort_descending(&mut scheduled, |s| &s.located)?;
        self.scheduled = scheduled;
        Ok(())
    }

    // ==================== Apply ====================

    /// Apply the scheduled node primitives.
    pub(crate) fn apply_nodes(
        &mut self,
        store: &mut dyn Store,
        options: &UpdateOptions,
    ) -> UpdateResult<NodeStats> {
        let scheduled = std::mem::take(&mut self.scheduled);
        let stats = apply_scheduled(store, &scheduled, options.merge_texts)?;
        self.scheduled = scheduled;
        Ok(stats)
    }

    /// Run whole-store operations: optimize, rename, drop.
    pub(crate) fn apply_store_ops(&self, catalog: &mut Catalog) -> UpdateResult<()> {
        if self.store_ops.optimize {
            catalog.optimize(self.source).map_err(storage)?;
        }
        if let Some(name) = &self.store_ops.rename {
            catalog.rename(self.source, name.clone()).map_err(storage)?;
        }
        if self.store_ops.drop {
            let mut store = catalog.drop_source(self.source).map_err(storage)?;
            store.finish_write();
        }
        Ok(())
    }

    /// Serialize every put target to its locations. Returns the number of writes.
    pub(crate) fn apply_puts(&self, store: &dyn Store, sink: &mut dyn Sink) -> UpdateResult<usize> {
        let mut written = 0;
        for put in self.puts.values() {
            let pre = store.pre_of_id(put.node).ok_or_else(|| {
                UpdateError::storage(format!("put target {} no longer exists", put.node))
            })?;
            let content = xml::serialize(store, pre).map_err(storage)?;
            for uri in &put.uris {
                sink.write(uri, &content)?;
                written += 1;
            }
        }
        Ok(written)
    }
}
