//! Application order of primitives.
//!
//! Primitives are applied from the highest to the lowest effective location,
//! so that every edit only shifts positions that have already been handled.
//!
//! Order (greater is applied first):
//! 1. larger effective location
//! 2. at equal locations, a primitive on a node contains the primitives on
//!    nodes strictly inside `(target, location)` and goes first
//! 3. larger target
//! 4. lower kind (declaration order of [`UpdateKind`])

use std::cmp::Ordering;

use pul_core::{Pre, StoreResult};
use pul_store::Store;

use crate::{UpdateError, UpdateKind, UpdateResult};

/// A primitive reduced to the values that decide its position in the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub target: Pre,
    /// Position at which the primitive edits the table
    pub location: Pre,
    pub kind: UpdateKind,
}

impl Located {
    pub fn new(target: Pre, location: Pre, kind: UpdateKind) -> Self {
        Self {
            target,
            location,
            kind,
        }
    }

    /// Compute the effective location of a primitive against the current table.
    pub fn resolve(store: &dyn Store, target: Pre, kind: UpdateKind) -> StoreResult<Self> {
        let location = match kind {
            UpdateKind::InsertAfter | UpdateKind::InsertInto => target + store.size(target)?,
            UpdateKind::InsertIntoFirst | UpdateKind::InsertAttribute => {
                target + 1 + store.attribute_count(target)?
            }
            _ => target,
        };
        Ok(Self::new(target, location, kind))
    }
}

fn containment(a: &Located, b: &Located) -> Ordering {
    if b.target < a.target && a.target < b.location {
        Ordering::Less
    } else if a.target < b.target && b.target < a.location {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

/// Compare two primitives; `Greater` means `a` is applied before `b`.
pub fn compare(a: &Located, b: &Located) -> Ordering {
    a.location
        .cmp(&b.location)
        .then_with(|| containment(a, b))
        .then_with(|| a.target.cmp(&b.target))
        .then_with(|| b.kind.cmp(&a.kind))
}

/// Sort into application order.
///
/// Two primitives that compare equal would make the order ambiguous and are
/// reported as an invariant violation.
pub fn sort_descending<T>(items: &mut [T], key: impl Fn(&T) -> &Located) -> UpdateResult<()> {
    items.sort_by(|a, b| compare(key(b), key(a)));
    for pair in items.windows(2) {
        let (a, b) = (key(&pair[0]), key(&pair[1]));
        if compare(a, b) == Ordering::Equal {
            return Err(UpdateError::invariant(format!(
                "ambiguous order of {} on {} and {} on {}",
                a.kind, a.target, b.kind, b.target
            )));
        }
    }
    Ok(())
}
