//! Session runner.

use pul_core::Principal;
use pul_export::Sink;
use pul_store::Catalog;
use pul_update::{ApplyReport, CancelHandle, Update, Updates};

use crate::error::SessionResult;
use crate::SessionRegistry;

/// Session ID type.
pub type SessionId = u64;

/// A principal's sequence of snapshots.
#[derive(Debug)]
pub struct Session {
    /// Unique session ID.
    id: SessionId,
    /// Principal on whose behalf updates are made.
    principal: Principal,
    /// Pending updates of the current snapshot.
    updates: Updates,
}

impl Session {
    /// Create a new session with an ordinary snapshot.
    pub fn new(id: SessionId, principal: Principal) -> Self {
        Self {
            id,
            principal,
            updates: Updates::new(),
        }
    }

    /// Replace the pending list, e.g. with one carrying permissions or options.
    pub fn with_updates(mut self, updates: Updates) -> Self {
        self.updates = updates;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn updates(&self) -> &Updates {
        &self.updates
    }

    pub fn pending_count(&self) -> usize {
        self.updates.pending_count()
    }

    /// Add an update to the current snapshot.
    pub fn add(&mut self, update: impl Into<Update>, catalog: &Catalog) -> SessionResult<()> {
        self.updates.add(update, &self.principal, catalog)?;
        Ok(())
    }

    /// Commit the current snapshot, registering it while it runs.
    pub fn commit(
        &mut self,
        catalog: &mut Catalog,
        sink: &mut dyn Sink,
        registry: &SessionRegistry,
    ) -> SessionResult<ApplyReport> {
        let handle = registry.begin(self.id);
        let result = self.commit_with(catalog, sink, &handle);
        registry.finish(self.id, &handle);
        result
    }

    /// Commit the current snapshot under an externally managed handle.
    pub fn commit_with(
        &mut self,
        catalog: &mut Catalog,
        sink: &mut dyn Sink,
        handle: &CancelHandle,
    ) -> SessionResult<ApplyReport> {
        tracing::debug!(session = self.id, principal = %self.principal, "committing snapshot");
        let report = self.updates.commit_with(catalog, sink, handle)?;
        Ok(report)
    }
}
