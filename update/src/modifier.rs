//! Context modifiers: the transaction scope of one snapshot.
//!
//! An ordinary scope checks write permissions when updates are added. A
//! transform scope only accepts updates on the local copies it created and
//! refuses puts and whole-store operations.

use std::collections::{BTreeMap, BTreeSet};

use pul_core::{Principal, SourceId, StoreError};
use pul_export::Sink;
use pul_store::{xml, Catalog, Store};

use crate::apply::storage;
use crate::{
    ApplyReport, DatabaseUpdates, Permissions, Update, UpdateError, UpdateOptions, UpdateResult,
};

/// Kind of transaction scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Ordinary,
    Transform { copied: BTreeSet<SourceId> },
}

/// Collects the ledgers of all sources touched by a snapshot.
#[derive(Debug, Clone)]
pub struct ContextModifier {
    scope: Scope,
    ledgers: BTreeMap<SourceId, DatabaseUpdates>,
}

impl ContextModifier {
    /// Create an ordinary scope.
    pub fn ordinary() -> Self {
        Self {
            scope: Scope::Ordinary,
            ledgers: BTreeMap::new(),
        }
    }

    /// Create a transform scope over the given local copies.
    pub fn transform(copied: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            scope: Scope::Transform {
                copied: copied.into_iter().collect(),
            },
            ledgers: BTreeMap::new(),
        }
    }

    /// An empty modifier with the same scope.
    pub fn fresh(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            ledgers: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of pending primitives over all sources.
    pub fn pending_count(&self) -> usize {
        self.ledgers.values().map(DatabaseUpdates::pending_count).sum()
    }

    /// Number of touched sources.
    pub fn source_count(&self) -> usize {
        self.ledgers.len()
    }

    /// Ledger of a source.
    pub fn ledger(&self, source: SourceId) -> Option<&DatabaseUpdates> {
        self.ledgers.get(&source)
    }

    /// Add an update to the ledger of its source.
    pub fn add(
        &mut self,
        update: Update,
        principal: &Principal,
        catalog: &Catalog,
        permissions: &dyn Permissions,
    ) -> UpdateResult<()> {
        let source = update.source();
        self.admit(&update, principal, catalog, permissions)?;
        let store = catalog.get(source)?;

        let ledger = self
            .ledgers
            .entry(source)
            .or_insert_with(|| DatabaseUpdates::new(source));
        let result = match update {
            Update::Node(primitive) => ledger.add(primitive, store),
            Update::Put(put) => ledger.add_put(put, store),
            Update::Store { op, .. } => ledger.add_store_op(op),
        };
        if ledger.is_empty() {
            self.ledgers.remove(&source);
        }
        result
    }

    fn admit(
        &self,
        update: &Update,
        principal: &Principal,
        catalog: &Catalog,
        permissions: &dyn Permissions,
    ) -> UpdateResult<()> {
        let source = update.source();
        match &self.scope {
            Scope::Ordinary => {
                if !permissions.has_write_permission(principal, source) {
                    let resource = catalog
                        .name(source)
                        .map_or_else(|| source.to_string(), str::to_string);
                    tracing::warn!(principal = %principal, resource = %resource, "write permission denied");
                    return Err(UpdateError::permission_denied(principal.name(), resource));
                }
            }
            Scope::Transform { copied } => {
                if !copied.contains(&source) {
                    return Err(UpdateError::copy_isolation(format!(
                        "source {} is not a copy of this transform",
                        source
                    )));
                }
                match update {
                    Update::Put(_) => {
                        return Err(UpdateError::copy_isolation("put inside a transform"));
                    }
                    Update::Store { .. } => {
                        return Err(UpdateError::copy_isolation(
                            "whole-store operation inside a transform",
                        ));
                    }
                    Update::Node(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Validate all ledgers without touching any store.
    ///
    /// Consumes the modifier; only the returned token can be applied.
    pub fn check(self, catalog: &Catalog, options: &UpdateOptions) -> UpdateResult<CheckedUpdates> {
        let mut ledgers: Vec<DatabaseUpdates> = self.ledgers.into_values().collect();
        for ledger in &mut ledgers {
            ledger.check(catalog, options)?;
        }

        let mut uris = BTreeSet::new();
        for uri in ledgers.iter().flat_map(DatabaseUpdates::put_uris) {
            if !uris.insert(uri) {
                return Err(UpdateError::duplicate_external_target(uri));
            }
        }
        if let Some(max) = options.max_put_targets {
            if uris.len() > max {
                return Err(UpdateError::invalid_target(format!(
                    "{} put targets exceed the limit of {}",
                    uris.len(),
                    max
                )));
            }
        }

        let mut names = BTreeSet::new();
        for name in ledgers.iter().filter_map(DatabaseUpdates::renamed_to) {
            if !names.insert(name) {
                return Err(UpdateError::name_conflict(format!(
                    "two sources renamed to {}",
                    name
                )));
            }
        }

        Ok(CheckedUpdates {
            ledgers,
            options: options.clone(),
        })
    }
}

/// A validated snapshot, ready to be applied.
#[derive(Debug)]
pub struct CheckedUpdates {
    ledgers: Vec<DatabaseUpdates>,
    options: UpdateOptions,
}

impl CheckedUpdates {
    /// Sources that will be locked and updated.
    pub fn sources(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.ledgers.iter().map(DatabaseUpdates::source)
    }

    pub fn pending_count(&self) -> usize {
        self.ledgers.iter().map(DatabaseUpdates::pending_count).sum()
    }

    /// Lock every source, apply all updates and release the locks.
    ///
    /// If a lock cannot be taken, nothing is changed. A failure after the
    /// locks are taken leaves the stores partially updated.
    pub fn apply(mut self, catalog: &mut Catalog, sink: &mut dyn Sink) -> UpdateResult<ApplyReport> {
        let sources: Vec<SourceId> = self.sources().collect();

        let mut locked = Vec::with_capacity(sources.len());
        for &source in &sources {
            let acquired = catalog
                .get_mut(source)
                .and_then(|store| store.start_write());
            if let Err(err) = acquired {
                release(catalog, &locked);
                tracing::warn!(source = %source, error = %err, "cannot lock source");
                return Err(match err {
                    StoreError::Locked(_) => UpdateError::locked(
                        catalog
                            .name(source)
                            .map_or_else(|| source.to_string(), str::to_string),
                    ),
                    other => other.into(),
                });
            }
            locked.push(source);
        }

        let result = self.apply_locked(catalog, sink);
        release(catalog, &locked);
        result
    }

    fn apply_locked(&mut self, catalog: &mut Catalog, sink: &mut dyn Sink) -> UpdateResult<ApplyReport> {
        let mut report = ApplyReport {
            sources: self.ledgers.len(),
            ..ApplyReport::default()
        };

        for ledger in &mut self.ledgers {
            let store = catalog.get_mut(ledger.source()).map_err(storage)?;
            let stats = ledger.apply_nodes(store, &self.options)?;
            report.applied += stats.applied;
            report.merged_texts += stats.merged;
        }

        for ledger in &self.ledgers {
            ledger.apply_store_ops(catalog)?;
        }

        for ledger in &self.ledgers {
            if ledger.put_uris().next().is_none() {
                continue;
            }
            let store = catalog.get(ledger.source()).map_err(storage)?;
            report.puts += ledger.apply_puts(store, sink)?;
        }

        for ledger in &self.ledgers {
            if !catalog.contains(ledger.source()) {
                continue;
            }
            let store = catalog.get_mut(ledger.source()).map_err(storage)?;
            store.flush().map_err(storage)?;
            if !self.options.write_back || !ledger.edits_nodes() {
                continue;
            }
            let store: &dyn Store = store;
            if let Some(location) = store.backing() {
                let content = xml::serialize_all(store).map_err(storage)?;
                sink.write(location, &content)?;
                report.exported += 1;
            }
        }
        sink.sync()?;

        Ok(report)
    }
}

fn release(catalog: &mut Catalog, sources: &[SourceId]) {
    for &source in sources {
        if let Ok(store) = catalog.get_mut(source) {
            store.finish_write();
        }
    }
}
