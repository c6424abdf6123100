//! Write permissions.

use std::collections::BTreeSet;

use pul_core::{Principal, SourceId};

/// Decides whether a principal may write a source.
pub trait Permissions {
    fn has_write_permission(&self, principal: &Principal, source: SourceId) -> bool;
}

/// Grants every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Permissions for AllowAll {
    fn has_write_permission(&self, _principal: &Principal, _source: SourceId) -> bool {
        true
    }
}

/// Explicit grants per principal and source.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    grants: BTreeSet<(Principal, SourceId)>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a principal to write a source.
    pub fn grant(mut self, principal: Principal, source: SourceId) -> Self {
        self.grants.insert((principal, source));
        self
    }

    /// Withdraw a grant.
    pub fn revoke(&mut self, principal: &Principal, source: SourceId) {
        self.grants.remove(&(principal.clone(), source));
    }
}

impl Permissions for AccessList {
    fn has_write_permission(&self, principal: &Principal, source: SourceId) -> bool {
        self.grants.contains(&(principal.clone(), source))
    }
}
