//! The catalog of all sources of one instance.
//!
//! A source is either a named store or an unnamed local copy created for a
//! transform scope. Whole-store operations (rename, drop, optimize) go
//! through the catalog.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use pul_core::{Pre, SourceId, StoreError, StoreResult};
use regex_lite::Regex;

use crate::{MemStore, Store};

fn source_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.\-]*$").expect("source name pattern is valid")
    })
}

/// Returns true if the string is a valid source name.
pub fn is_valid_source_name(name: &str) -> bool {
    source_name_pattern().is_match(name)
}

#[derive(Debug)]
struct Entry {
    /// `None` for local copies
    name: Option<String>,
    store: Box<dyn Store>,
}

/// All sources of one instance.
#[derive(Debug, Default)]
pub struct Catalog {
    sources: BTreeMap<SourceId, Entry>,
    next_id: u32,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> SourceId {
        let id = SourceId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register a named store.
    pub fn add(&mut self, name: impl Into<String>, store: impl Store + 'static) -> StoreResult<SourceId> {
        let name = name.into();
        if !is_valid_source_name(&name) {
            return Err(StoreError::invalid_name(name));
        }
        if self.find(&name).is_some() {
            return Err(StoreError::duplicate_name(name));
        }
        let id = self.alloc_id();
        self.sources.insert(
            id,
            Entry {
                name: Some(name),
                store: Box::new(store),
            },
        );
        Ok(id)
    }

    /// Register an unnamed local copy.
    pub fn add_copy(&mut self, store: impl Store + 'static) -> SourceId {
        let id = self.alloc_id();
        self.sources.insert(
            id,
            Entry {
                name: None,
                store: Box::new(store),
            },
        );
        id
    }

    /// Copy the subtree at a position into a new local source.
    pub fn copy_node(&mut self, source: SourceId, pre: Pre) -> StoreResult<SourceId> {
        let fragment = self.get(source)?.fragment(pre)?;
        Ok(self.add_copy(MemStore::from_fragment(fragment)))
    }

    pub fn contains(&self, source: SourceId) -> bool {
        self.sources.contains_key(&source)
    }

    pub fn get(&self, source: SourceId) -> StoreResult<&dyn Store> {
        self.sources
            .get(&source)
            .map(|entry| entry.store.as_ref())
            .ok_or(StoreError::SourceNotFound(source))
    }

    pub fn get_mut(&mut self, source: SourceId) -> StoreResult<&mut (dyn Store + 'static)> {
        self.sources
            .get_mut(&source)
            .map(|entry| entry.store.as_mut())
            .ok_or(StoreError::SourceNotFound(source))
    }

    /// Name of a source (`None` for local copies and unknown sources).
    pub fn name(&self, source: SourceId) -> Option<&str> {
        self.sources.get(&source).and_then(|entry| entry.name.as_deref())
    }

    /// Find a named source.
    pub fn find(&self, name: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .find(|(_, entry)| entry.name.as_deref() == Some(name))
            .map(|(&id, _)| id)
    }

    /// Ids of all sources.
    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.keys().copied()
    }

    /// Rename a source.
    pub fn rename(&mut self, source: SourceId, name: impl Into<String>) -> StoreResult<()> {
        let name = name.into();
        if !is_valid_source_name(&name) {
            return Err(StoreError::invalid_name(name));
        }
        if self.find(&name).is_some_and(|other| other != source) {
            return Err(StoreError::duplicate_name(name));
        }
        let entry = self
            .sources
            .get_mut(&source)
            .ok_or(StoreError::SourceNotFound(source))?;
        tracing::debug!(source = %source, name = %name, "renamed source");
        entry.name = Some(name);
        Ok(())
    }

    /// Remove a source, returning its store.
    pub fn drop_source(&mut self, source: SourceId) -> StoreResult<Box<dyn Store>> {
        let entry = self
            .sources
            .remove(&source)
            .ok_or(StoreError::SourceNotFound(source))?;
        tracing::debug!(source = %source, "dropped source");
        Ok(entry.store)
    }

    /// Compact a source.
    pub fn optimize(&mut self, source: SourceId) -> StoreResult<()> {
        self.get_mut(source)?.optimize()
    }
}
