//! Name pool for the names around one element.
//!
//! Collects the attribute names an element will carry after the update
//! (existing names minus removed ones plus added ones) and the prefixes used
//! by the element and its attributes.

use std::collections::BTreeMap;

use pul_core::QName;

/// Two URIs bound to the same prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceClash {
    pub prefix: String,
    pub first: String,
    pub second: String,
}

#[derive(Debug, Clone)]
struct PoolEntry {
    name: QName,
    count: isize,
}

/// Transient name counter.
#[derive(Debug, Clone, Default)]
pub struct NamePool {
    /// Keyed by (namespace URI, local name, is attribute)
    entries: BTreeMap<(Option<String>, String, bool), PoolEntry>,
}

impl NamePool {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &QName, attribute: bool) -> (Option<String>, String, bool) {
        (name.uri.clone(), name.local.clone(), attribute)
    }

    /// Count a name that will be present.
    pub fn add(&mut self, name: &QName, attribute: bool) {
        self.entries
            .entry(Self::key(name, attribute))
            .and_modify(|entry| {
                entry.count += 1;
                entry.name = name.clone();
            })
            .or_insert_with(|| PoolEntry {
                name: name.clone(),
                count: 1,
            });
    }

    /// Uncount a name that will be removed.
    pub fn remove(&mut self, name: &QName, attribute: bool) {
        self.entries
            .entry(Self::key(name, attribute))
            .and_modify(|entry| entry.count -= 1)
            .or_insert_with(|| PoolEntry {
                name: name.clone(),
                count: -1,
            });
    }

    /// First attribute name counted more than once.
    pub fn duplicate(&self) -> Option<&QName> {
        self.entries
            .iter()
            .find(|((_, _, attribute), entry)| *attribute && entry.count > 1)
            .map(|(_, entry)| &entry.name)
    }

    /// Check that every prefix in use is bound to a single URI.
    pub fn namespace_ok(&self) -> Result<(), NamespaceClash> {
        let mut bindings: BTreeMap<&str, &str> = BTreeMap::new();
        for entry in self.entries.values().filter(|e| e.count > 0) {
            if !entry.name.binds_prefix() {
                continue;
            }
            let (Some(prefix), Some(uri)) = (entry.name.prefix.as_deref(), entry.name.uri.as_deref())
            else {
                continue;
            };
            match bindings.get(prefix) {
                Some(&bound) if bound != uri => {
                    return Err(NamespaceClash {
                        prefix: prefix.to_string(),
                        first: bound.to_string(),
                        second: uri.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    bindings.insert(prefix, uri);
                }
            }
        }
        Ok(())
    }
}
