//! Registry of in-flight snapshots.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use pul_core::Principal;
use pul_update::CancelHandle;

use crate::error::{SessionError, SessionResult};
use crate::{Session, SessionId};

/// Maps each session to the cancellation handle of its running snapshot.
///
/// Shared between threads; a session may be cancelled from anywhere.
#[derive(Debug)]
pub struct SessionRegistry {
    next_id: Mutex<SessionId>,
    active: Mutex<HashMap<SessionId, CancelHandle>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: Mutex::new(1),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a new session ID.
    pub fn alloc_id(&self) -> SessionId {
        let mut next = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next;
        *next += 1;
        id
    }

    /// Open a session for a principal.
    pub fn open(&self, principal: Principal) -> Session {
        Session::new(self.alloc_id(), principal)
    }

    fn active(&self) -> MutexGuard<'_, HashMap<SessionId, CancelHandle>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new snapshot of a session.
    ///
    /// A snapshot still registered for the same session is cancelled.
    pub fn begin(&self, id: SessionId) -> CancelHandle {
        let handle = CancelHandle::new();
        if let Some(previous) = self.active().insert(id, handle.clone()) {
            tracing::debug!(session = id, "cancelling superseded snapshot");
            previous.cancel();
        }
        handle
    }

    /// Unregister a finished snapshot.
    ///
    /// A newer snapshot registered for the same session stays registered.
    pub fn finish(&self, id: SessionId, handle: &CancelHandle) {
        let mut active = self.active();
        if active.get(&id).is_some_and(|current| current.same_snapshot(handle)) {
            active.remove(&id);
        }
    }

    /// Cancel the running snapshot of a session.
    pub fn cancel(&self, id: SessionId) -> SessionResult<()> {
        let handle = self
            .active()
            .remove(&id)
            .ok_or_else(|| SessionError::session_not_found(id))?;
        tracing::debug!(session = id, "snapshot cancelled");
        handle.cancel();
        Ok(())
    }

    pub fn is_active(&self, id: SessionId) -> bool {
        self.active().contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }
}
