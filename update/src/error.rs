//! Update error types.

use pul_core::StoreError;
use pul_export::ExportError;
use thiserror::Error;

/// Result type for update operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Coarse classification of update errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NameConflict,
    DanglingTarget,
    DuplicateExternalTarget,
    CopyIsolation,
    PermissionDenied,
    Locked,
    Storage,
    InvalidTarget,
    Cancelled,
    Internal,
}

/// Errors raised while collecting, checking or applying updates.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Name conflict: {message}")]
    NameConflict { message: String },

    #[error("Duplicate attribute: {name}")]
    DuplicateAttribute { name: String },

    #[error("Namespace conflict: prefix {prefix} bound to {first} and {second}")]
    NamespaceConflict {
        prefix: String,
        first: String,
        second: String,
    },

    #[error("Dangling target: {message}")]
    DanglingTarget { message: String },

    #[error("Duplicate external target: {location}")]
    DuplicateExternalTarget { location: String },

    #[error("Copy isolation violated: {message}")]
    CopyIsolation { message: String },

    #[error("Permission denied: {principal} cannot write {resource}")]
    PermissionDenied { principal: String, resource: String },

    #[error("Resource locked: {resource}")]
    Locked { resource: String },

    /// Failure of the storage or export layer after apply has begun.
    #[error("Storage failure: {message}")]
    Storage { message: String },

    #[error("Invalid target: {message}")]
    InvalidTarget { message: String },

    #[error("Update cancelled")]
    Cancelled,

    #[error("Invariant violated: {message}")]
    Invariant { message: String },
}

impl UpdateError {
    pub fn name_conflict(message: impl Into<String>) -> Self {
        Self::NameConflict {
            message: message.into(),
        }
    }

    pub fn duplicate_attribute(name: impl Into<String>) -> Self {
        Self::DuplicateAttribute { name: name.into() }
    }

    pub fn namespace_conflict(
        prefix: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::NamespaceConflict {
            prefix: prefix.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn dangling_target(message: impl Into<String>) -> Self {
        Self::DanglingTarget {
            message: message.into(),
        }
    }

    pub fn duplicate_external_target(location: impl Into<String>) -> Self {
        Self::DuplicateExternalTarget {
            location: location.into(),
        }
    }

    pub fn copy_isolation(message: impl Into<String>) -> Self {
        Self::CopyIsolation {
            message: message.into(),
        }
    }

    pub fn permission_denied(principal: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::PermissionDenied {
            principal: principal.into(),
            resource: resource.into(),
        }
    }

    pub fn locked(resource: impl Into<String>) -> Self {
        Self::Locked {
            resource: resource.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn invalid_target(message: impl Into<String>) -> Self {
        Self::InvalidTarget {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Coarse kind of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NameConflict { .. }
            | Self::DuplicateAttribute { .. }
            | Self::NamespaceConflict { .. } => ErrorKind::NameConflict,
            Self::DanglingTarget { .. } => ErrorKind::DanglingTarget,
            Self::DuplicateExternalTarget { .. } => ErrorKind::DuplicateExternalTarget,
            Self::CopyIsolation { .. } => ErrorKind::CopyIsolation,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Locked { .. } => ErrorKind::Locked,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::InvalidTarget { .. } => ErrorKind::InvalidTarget,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Invariant { .. } => ErrorKind::Internal,
        }
    }

    /// Returns true if the error left the stores partially updated.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

/// Store errors raised while collecting or checking updates.
///
/// Failures after apply has begun are wrapped with [`UpdateError::storage`] instead.
impl From<StoreError> for UpdateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Locked(resource) => Self::locked(resource),
            other @ (StoreError::OutOfRange { .. }
            | StoreError::NodeNotFound(_)
            | StoreError::InvalidKind { .. }
            | StoreError::InvalidName(_)
            | StoreError::SourceNotFound(_)) => Self::invalid_target(other.to_string()),
            other => Self::storage(other.to_string()),
        }
    }
}

impl From<ExportError> for UpdateError {
    fn from(err: ExportError) -> Self {
        Self::storage(err.to_string())
    }
}
