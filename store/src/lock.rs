//! Write locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exclusive write lock of one source.
///
/// Cloned handles share the same flag, so a second snapshot holding a clone
/// observes the lock taken by the first one.
#[derive(Debug, Clone, Default)]
pub struct WriteLock {
    held: Arc<AtomicBool>,
}

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock. Returns false if it is already held.
    pub fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the lock.
    pub fn release(&self) {
        self.held.store(false, Ordering::Release);
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}
