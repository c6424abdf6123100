//! Application of ordered node primitives.
//!
//! Primitives arrive sorted from the highest to the lowest effective
//! location. Every insertion and removal leaves a seam: a position whose row
//! may now be a text node directly following another text node of the same
//! parent. Seams are merged lazily, once all remaining primitives lie below
//! the seam, so that no pending primitive sees a position shifted by a merge.

use std::collections::BTreeSet;

use pul_core::{Fragment, NodeKind, Pre, Row, StoreError};
use pul_store::Store;

use crate::{Located, NodeOp, UpdateError, UpdateResult};

/// A checked primitive with its precomputed location.
#[derive(Debug, Clone)]
pub(crate) struct Scheduled {
    pub located: Located,
    /// Node whose children are edited. Lies before the location, so edits
    /// applied earlier never shift it.
    pub anchor: Option<Pre>,
    pub op: NodeOp,
}

impl Scheduled {
    pub fn resolve(store: &dyn Store, target: Pre, op: NodeOp) -> UpdateResult<Self> {
        let located = Located::resolve(store, target, op.kind())?;
        let anchor = match op {
            NodeOp::InsertInto { .. } | NodeOp::InsertIntoFirst(_) | NodeOp::InsertAttribute(_) => {
                Some(target)
            }
            _ => store.parent(target)?,
        };
        Ok(Self {
            located,
            anchor,
            op,
        })
    }
}

/// Counters of one apply run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NodeStats {
    pub applied: usize,
    pub merged: usize,
}

pub(crate) fn storage(err: StoreError) -> UpdateError {
    tracing::error!(error = %err, "storage failure during apply");
    UpdateError::storage(err.to_string())
}

/// Merge adjacent top-level texts of a sequence and drop empty ones.
pub(crate) fn normalize_texts(fragment: &Fragment) -> Fragment {
    let rows = fragment.rows();
    let mut out: Vec<Row> = Vec::with_capacity(rows.len());
    let mut open_text: Option<usize> = None;

    for offset in fragment.roots() {
        let row = &rows[offset];
        if row.kind == NodeKind::Text {
            let value = row.value.as_deref().unwrap_or_default();
            if value.is_empty() {
                continue;
            }
            match open_text {
                Some(i) => out[i].value.get_or_insert_with(String::new).push_str(value),
                None => {
                    open_text = Some(out.len());
                    out.push(row.clone());
                }
            }
        } else {
            open_text = None;
            let end = (offset + row.size).min(rows.len());
            out.extend_from_slice(&rows[offset..end]);
        }
    }
    Fragment::from_rows(out)
}

/// Pending text seams, kept in current positions.
#[derive(Debug, Default)]
pub(crate) struct TextSeams {
    seams: BTreeSet<Pre>,
}

impl TextSeams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` rows inserted at `pre`.
    pub fn inserted(&mut self, pre: Pre, n: usize) {
        if n == 0 {
            return;
        }
        let shifted = self.seams.split_off(&pre);
        self.seams.extend(shifted.into_iter().map(|s| s + n));
        self.seams.insert(pre);
        self.seams.insert(pre + n);
    }

    /// Record `n` rows removed at `pre`.
    pub fn deleted(&mut self, pre: Pre, n: usize) {
        let mut removed = self.seams.split_off(&(pre + 1));
        let shifted = removed.split_off(&(pre + n));
        self.seams.extend(shifted.into_iter().map(|s| s - n));
        self.seams.insert(pre);
    }

    /// Merge the seams whose left row lies above `frontier`, or all seams.
    pub fn resolve(&mut self, store: &mut dyn Store, frontier: Option<Pre>) -> UpdateResult<usize> {
        let eligible: Vec<Pre> = self
            .seams
            .iter()
            .rev()
            .copied()
            .take_while(|&s| frontier.map_or(true, |f| s > f + 1))
            .collect();

        let mut merged = 0;
        for seam in eligible {
            self.seams.remove(&seam);
            if merge_at(store, seam)? {
                merged += 1;
            }
        }
        Ok(merged)
    }
}

/// Merge the text at `seam` into the text before it, if both are siblings.
fn merge_at(store: &mut dyn Store, seam: Pre) -> UpdateResult<bool> {
    if seam == 0 || seam >= store.len() {
        return Ok(false);
    }
    let (left, right) = (store.row(seam - 1).map_err(storage)?, store.row(seam).map_err(storage)?);
    if left.kind != NodeKind::Text || right.kind != NodeKind::Text {
        return Ok(false);
    }
    if store.parent(seam - 1).map_err(storage)? != store.parent(seam).map_err(storage)? {
        return Ok(false);
    }

    let mut value = left.value.clone().unwrap_or_default();
    value.push_str(right.value.as_deref().unwrap_or_default());
    tracing::debug!(pre = seam - 1, "merging adjacent texts");
    store.update_value(seam - 1, value).map_err(storage)?;
    store.delete(seam).map_err(storage)?;
    Ok(true)
}

fn apply_one(store: &mut dyn Store, seams: &mut TextSeams, scheduled: &Scheduled) -> UpdateResult<()> {
    let Located {
        target, location, ..
    } = scheduled.located;

    match &scheduled.op {
        NodeOp::InsertBefore(content) | NodeOp::InsertAfter(content) => {
            let parent = scheduled
                .anchor
                .ok_or_else(|| UpdateError::invariant(format!("sibling insert on root {}", target)))?;
            insert(store, seams, location, parent, content)?;
        }
        NodeOp::InsertInto { content, .. }
        | NodeOp::InsertIntoFirst(content)
        | NodeOp::InsertAttribute(content) => {
            insert(store, seams, location, target, content)?;
        }
        NodeOp::Delete { .. } => {
            let delta = store.delete(target).map_err(storage)?;
            seams.deleted(target, delta.unsigned_abs());
        }
        NodeOp::ReplaceNode(content) => {
            let content = normalize_texts(content);
            let size = store.size(target).map_err(storage)?;
            store.replace(target, &content).map_err(storage)?;
            seams.deleted(target, size);
            seams.inserted(target, content.len());
        }
        NodeOp::ReplaceValue(value) => {
            store.update_value(target, value.clone()).map_err(storage)?;
        }
        NodeOp::Rename(name) => {
            store.rename(target, name.clone()).map_err(storage)?;
        }
        NodeOp::ReplaceElementContent(_) => {
            return Err(UpdateError::invariant(format!(
                "unexpanded replace-element-content on {}",
                target
            )));
        }
    }

    tracing::debug!(
        kind = %scheduled.op.kind(),
        pre = target,
        location,
        "applied primitive"
    );
    Ok(())
}

fn insert(
    store: &mut dyn Store,
    seams: &mut TextSeams,
    location: Pre,
    parent: Pre,
    content: &Fragment,
) -> UpdateResult<()> {
    let content = normalize_texts(content);
    let delta = store.insert(location, parent, &content).map_err(storage)?;
    seams.inserted(location, delta.unsigned_abs());
    Ok(())
}

/// Apply primitives in the given order, merging texts if requested.
///
/// Seams are resolved whenever the edited parent changes, bounded by the
/// location of the next primitive, and completely at the end.
pub(crate) fn apply_scheduled(
    store: &mut dyn Store,
    scheduled: &[Scheduled],
    merge_texts: bool,
) -> UpdateResult<NodeStats> {
    let mut stats = NodeStats::default();
    let mut seams = TextSeams::new();
    let mut group: Option<Option<Pre>> = None;

    for item in scheduled {
        if merge_texts && group.is_some_and(|g| g != item.anchor) {
            stats.merged += seams.resolve(store, Some(item.located.location))?;
        }
        group = Some(item.anchor);

        apply_one(store, &mut seams, item)?;
        stats.applied += 1;
    }

    if merge_texts {
        stats.merged += seams.resolve(store, None)?;
    }
    Ok(stats)
}
