//! Common error types for PUL.

use crate::{NodeId, Pre, SourceId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Position outside of the table.
    #[error("Position out of range: {pre} (size {size})")]
    OutOfRange { pre: Pre, size: usize },

    /// Node id no longer present.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Operation not applicable to the node kind.
    #[error("Invalid operation on {kind} node at {pre}: {message}")]
    InvalidKind {
        pre: Pre,
        kind: String,
        message: String,
    },

    /// Lexically invalid name.
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Source already write-locked.
    #[error("Source is locked: {0}")]
    Locked(String),

    /// Unknown source.
    #[error("Source not found: {0}")]
    SourceNotFound(SourceId),

    /// Another source already uses the name.
    #[error("Source name already in use: {0}")]
    DuplicateName(String),

    /// Malformed XML input.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization failure.
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// IO failure while flushing or exporting.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn out_of_range(pre: Pre, size: usize) -> Self {
        Self::OutOfRange { pre, size }
    }

    pub fn invalid_kind(pre: Pre, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKind {
            pre,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    pub fn locked(name: impl Into<String>) -> Self {
        Self::Locked(name.into())
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn serialize(message: impl Into<String>) -> Self {
        Self::Serialize(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
