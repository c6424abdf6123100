//! Session error types.

use pul_update::UpdateError;
use thiserror::Error;

use crate::SessionId;

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Update engine error.
    #[error("update error: {0}")]
    Update(#[from] UpdateError),

    /// Session not found.
    #[error("session not found: {id}")]
    SessionNotFound { id: SessionId },
}

impl SessionError {
    pub fn session_not_found(id: SessionId) -> Self {
        Self::SessionNotFound { id }
    }

    /// Returns true if the snapshot was cancelled before it was applied.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Update(UpdateError::Cancelled))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
