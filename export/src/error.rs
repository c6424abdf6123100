//! Export error types.

use thiserror::Error;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error while writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Location cannot be written by this sink.
    #[error("invalid location: {location}")]
    InvalidLocation { location: String },

    /// Write refused by the destination.
    #[error("write to {location} failed: {message}")]
    WriteFailed { location: String, message: String },
}

impl ExportError {
    pub fn invalid_location(location: impl Into<String>) -> Self {
        Self::InvalidLocation {
            location: location.into(),
        }
    }

    pub fn write_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            location: location.into(),
            message: message.into(),
        }
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
