//! Entry point of a snapshot: collect, check and apply updates.

use pul_core::{Principal, SourceId};
use pul_export::Sink;
use pul_store::Catalog;

use crate::{
    AllowAll, CancelHandle, ContextModifier, Permissions, Update, UpdateError, UpdateOptions,
    UpdateResult,
};

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Sources that were locked and updated
    pub sources: usize,
    /// Node primitives applied
    pub applied: usize,
    /// Adjacent text nodes merged
    pub merged_texts: usize,
    /// Serialized put targets written to the sink
    pub puts: usize,
    /// Sources written back to their backing location
    pub exported: usize,
}

/// Pending update list of one snapshot.
pub struct Updates {
    modifier: ContextModifier,
    permissions: Box<dyn Permissions>,
    options: UpdateOptions,
}

impl std::fmt::Debug for Updates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updates")
            .field("modifier", &self.modifier)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Updates {
    fn default() -> Self {
        Self::new()
    }
}

impl Updates {
    /// Create an ordinary snapshot that allows all writes.
    pub fn new() -> Self {
        Self {
            modifier: ContextModifier::ordinary(),
            permissions: Box::new(AllowAll),
            options: UpdateOptions::default(),
        }
    }

    /// Create a transform snapshot over the given local copies.
    pub fn transform(copied: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            modifier: ContextModifier::transform(copied),
            ..Self::new()
        }
    }

    pub fn with_permissions(mut self, permissions: impl Permissions + 'static) -> Self {
        self.permissions = Box::new(permissions);
        self
    }

    pub fn with_options(mut self, options: UpdateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &UpdateOptions {
        &self.options
    }

    pub fn modifier(&self) -> &ContextModifier {
        &self.modifier
    }

    /// Add an update to the pending list.
    pub fn add(
        &mut self,
        update: impl Into<Update>,
        principal: &Principal,
        catalog: &Catalog,
    ) -> UpdateResult<()> {
        self.modifier
            .add(update.into(), principal, catalog, self.permissions.as_ref())
    }

    /// Number of pending primitives.
    pub fn pending_count(&self) -> usize {
        self.modifier.pending_count()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// Check and apply all pending updates.
    pub fn commit(&mut self, catalog: &mut Catalog, sink: &mut dyn Sink) -> UpdateResult<ApplyReport> {
        self.commit_with(catalog, sink, &CancelHandle::new())
    }

    /// Check and apply all pending updates, unless cancelled before locking.
    ///
    /// The pending list is emptied whatever the outcome.
    pub fn commit_with(
        &mut self,
        catalog: &mut Catalog,
        sink: &mut dyn Sink,
        cancel: &CancelHandle,
    ) -> UpdateResult<ApplyReport> {
        let fresh = self.modifier.fresh();
        let modifier = std::mem::replace(&mut self.modifier, fresh);

        let pending = modifier.pending_count();
        if pending == 0 {
            return Ok(ApplyReport::default());
        }
        tracing::info!(
            sources = modifier.source_count(),
            pending,
            "committing updates"
        );

        let checked = modifier.check(catalog, &self.options).map_err(|err| {
            tracing::warn!(error = %err, kind = ?err.kind(), "update check failed");
            err
        })?;

        if cancel.is_cancelled() {
            tracing::warn!("commit cancelled before locking");
            return Err(UpdateError::Cancelled);
        }

        let report = checked.apply(catalog, sink)?;
        tracing::info!(
            sources = report.sources,
            applied = report.applied,
            merged = report.merged_texts,
            puts = report.puts,
            "updates committed"
        );
        Ok(report)
    }
}
